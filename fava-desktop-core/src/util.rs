use std::path::Path;

use url::Url;

/// Path prefix under which sandboxed runtimes (Flatpak document portal)
/// expose files. Directories below it are opaque ids, not meaningful to the
/// user.
pub const SANDBOX_RUNTIME_PREFIX: &str = "/run/user";

/// File extensions recognised as Beancount ledgers.
pub const LEDGER_EXTENSIONS: &[&str] = &["beancount", "bean"];

/// Convert a local path to a `file://` URI.
pub fn file_path_to_uri(path: &Path) -> Option<String> {
    if path.is_dir() {
        Url::from_directory_path(path).ok().map(|u| u.to_string())
    } else {
        Url::from_file_path(path).ok().map(|u| u.to_string())
    }
}

/// Convert a `file://` URI to a local file path string, percent-decoded.
///
/// Anything that does not name a local file (other schemes, remote hosts,
/// unparsable input) is returned unchanged, so the caller's existence check
/// rejects it.
pub fn uri_to_file_path(uri: &str) -> String {
    Url::parse(uri)
        .ok()
        .filter(|parsed| parsed.scheme() == "file")
        .and_then(|parsed| parsed.to_file_path().ok())
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|| uri.to_string())
}

/// Window title for a document: its file name.
pub fn document_title(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Window subtitle for a document: its parent directory, or `None` when the
/// document lives under the sandbox runtime prefix.
pub fn document_subtitle(path: &Path) -> Option<String> {
    if is_sandbox_runtime_path(path) {
        return None;
    }
    path.parent()
        .map(|p| p.to_string_lossy().to_string())
        .filter(|p| !p.is_empty())
}

pub fn is_sandbox_runtime_path(path: &Path) -> bool {
    path.to_string_lossy().starts_with(SANDBOX_RUNTIME_PREFIX)
}

/// Whether `path` has a Beancount ledger extension (case-insensitive).
#[must_use]
pub fn is_ledger_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            LEDGER_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Whether a navigation to `uri` leaves the Fava server rooted at `base_url`.
///
/// Only `http`/`https`/`mailto` targets count as external; internal schemes
/// such as `about:` or `data:` stay in the view.
pub fn is_external_link(uri: &str, base_url: Option<&str>) -> bool {
    let Ok(target) = Url::parse(uri) else {
        return false;
    };
    match target.scheme() {
        "mailto" => true,
        "http" | "https" => match base_url.and_then(|b| Url::parse(b).ok()) {
            Some(base) => target.origin() != base.origin(),
            None => true,
        },
        _ => false,
    }
}
