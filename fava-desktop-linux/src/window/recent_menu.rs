use gtk4::gio;
use gtk4::prelude::*;

use fava_desktop_core::recent::{self, MAX_RECENT_ENTRIES};
use fava_desktop_core::window::RecentDocuments;

/// The desktop-wide recently used files list.
pub(super) struct GtkRecentDocuments {
    manager: gtk4::RecentManager,
}

impl GtkRecentDocuments {
    pub fn new(manager: gtk4::RecentManager) -> Self {
        GtkRecentDocuments { manager }
    }
}

impl RecentDocuments for GtkRecentDocuments {
    fn add_item(&self, uri: &str) {
        if !self.manager.add_item(uri) {
            log::warn!("Failed to add {} to recent files", uri);
        }
    }

    fn refresh(&self) {
        // The manager does not revalidate its items when a menu opens.
        self.manager.emit_by_name::<()>("changed", &[]);
    }
}

/// Menu of recent ledgers, each activating `win.open-recent` with its URI.
pub(super) fn build_menu(manager: &gtk4::RecentManager) -> gio::Menu {
    let mut items = manager.items();
    items.sort_by_key(|info| std::cmp::Reverse(info.modified().to_unix()));
    let uris: Vec<String> = items.iter().map(|info| info.uri().to_string()).collect();
    let entries = recent::recent_entries(uris.iter().map(String::as_str), MAX_RECENT_ENTRIES);

    let menu = gio::Menu::new();
    if entries.is_empty() {
        menu.append(Some("No Recent Files"), None);
        return menu;
    }
    for entry in entries {
        // Menu labels treat '_' as a mnemonic marker.
        let label = entry.label.replace('_', "__");
        let item = gio::MenuItem::new(Some(&label), None);
        item.set_action_and_target_value(Some("win.open-recent"), Some(&entry.uri.to_variant()));
        menu.append_item(&item);
    }
    menu
}
