use gtk4::gio;
use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;

use fava_desktop_core::window::{DisplayState, Panel, WindowSurface};

pub(super) const PLACEHOLDER_PAGE: &str = "placeholder";
pub(super) const CONTENT_PAGE: &str = "content";

/// Widgets and actions the controller drives.
pub(super) struct GtkSurface {
    pub window: adw::ApplicationWindow,
    pub window_title: adw::WindowTitle,
    pub stack: gtk4::Stack,
    pub search_bar: gtk4::SearchBar,
    pub search_entry: gtk4::SearchEntry,
    pub search_action: gio::SimpleAction,
    pub search_toggle_action: gio::SimpleAction,
    pub toast_overlay: adw::ToastOverlay,
}

impl WindowSurface for GtkSurface {
    fn render(&self, state: &DisplayState) {
        self.window.set_title(Some(&state.title));
        self.window_title.set_title(&state.title);
        self.window_title
            .set_subtitle(state.subtitle.as_deref().unwrap_or(""));

        let page = match state.panel {
            Panel::Placeholder => PLACEHOLDER_PAGE,
            Panel::Content => CONTENT_PAGE,
        };
        self.stack.set_visible_child_name(page);

        self.search_action.set_enabled(state.search_enabled);
        self.search_toggle_action.set_enabled(state.search_enabled);
        self.search_toggle_action
            .set_state(&state.search_active.to_variant());
        self.search_bar.set_search_mode(state.search_active);
    }

    fn focus_search_entry(&self) {
        self.search_entry.select_region(0, -1);
        self.search_entry.grab_focus();
    }

    fn clear_search_entry(&self) {
        self.search_entry.set_text("");
    }

    fn show_error(&self, message: &str) {
        let toast = adw::Toast::new(message);
        toast.set_timeout(5);
        self.toast_overlay.add_toast(toast);
    }

    fn size(&self) -> Option<(i32, i32)> {
        let (width, height) = self.window.default_size();
        (width > 0 && height > 0).then_some((width, height))
    }

    fn destroy(&self) {
        self.window.destroy();
    }
}
