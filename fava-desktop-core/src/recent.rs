use std::collections::HashSet;
use std::path::Path;

use crate::util;

/// Maximum number of entries shown in the recent-files menu.
pub const MAX_RECENT_ENTRIES: usize = 10;

/// One row of the recent-files menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub label: String,
    pub uri: String,
}

/// Build menu entries from recently used URIs, most recent first.
///
/// Keeps only `file://` ledgers that still exist, drops duplicates and stops
/// after `limit` entries.
pub fn recent_entries<'a, I>(uris: I, limit: usize) -> Vec<RecentEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for uri in uris {
        if entries.len() >= limit {
            break;
        }
        if !uri.starts_with("file://") {
            continue;
        }
        let path = util::uri_to_file_path(uri);
        let path = Path::new(&path);
        if !util::is_ledger_file(path) || !path.is_file() {
            continue;
        }
        if !seen.insert(path.to_path_buf()) {
            continue;
        }
        entries.push(RecentEntry {
            label: util::document_title(path),
            uri: uri.to_string(),
        });
    }
    entries
}
