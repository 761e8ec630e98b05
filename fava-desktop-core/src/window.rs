//! Toolkit-independent controller for the main application window.
//!
//! The controller owns the document reference and the search state, talks
//! to its collaborators through the traits below, and pushes a freshly
//! derived [`DisplayState`] to the [`WindowSurface`] after every change.

use std::path::{Path, PathBuf};

use crate::server::{ServerEvent, ServerEventKind};
use crate::settings::SettingsStore;
use crate::util;

/// Title shown while no document is open.
pub const DEFAULT_TITLE: &str = "Fava";

/// Upper bound on highlighted matches per in-page search.
pub const MAX_MATCH_COUNT: u32 = 32;

/// Starts and stops the web application serving a ledger.
pub trait DocumentServer {
    /// Begin serving `path`. Completion is reported asynchronously through a
    /// [`ServerEvent`] tagged with the then-current generation.
    fn start(&mut self, path: &Path);
    /// Stop serving. Safe to call at any time, including before a start
    /// completed.
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    fn generation(&self) -> u64;
}

/// The OS-level recently used documents list.
pub trait RecentDocuments {
    fn add_item(&self, uri: &str);
    /// Make the store re-emit its change notification so listeners rebuild
    /// from current data.
    fn refresh(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    pub case_insensitive: bool,
    pub wrap_around: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        FindOptions {
            case_insensitive: true,
            wrap_around: true,
        }
    }
}

/// The embedded browser widget and its find controller.
pub trait BrowserView {
    fn load_url(&self, url: &str);
    fn find(&self, term: &str, options: FindOptions, max_match_count: u32);
    fn find_next(&self);
    fn find_previous(&self);
    /// End the find session and clear highlights.
    fn find_finish(&self);
    fn grab_focus(&self);
}

/// Window chrome driven by the controller.
pub trait WindowSurface {
    fn render(&self, state: &DisplayState);
    /// Select all text in the search entry and focus it.
    fn focus_search_entry(&self);
    fn clear_search_entry(&self);
    fn show_error(&self, message: &str);
    /// Current window size, saved together with the last used file.
    fn size(&self) -> Option<(i32, i32)>;
    /// Tear the window down. Must not call back into the controller.
    fn destroy(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Placeholder,
    Content,
}

/// Everything the surface shows, derived from controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub title: String,
    pub subtitle: Option<String>,
    pub panel: Panel,
    /// Whether the search and search-toggle actions are enabled.
    pub search_enabled: bool,
    /// Drives both search-bar visibility and the toggle action state.
    pub search_active: bool,
}

impl DisplayState {
    pub fn derive(document: Option<&Path>, content_loaded: bool, search: SearchState) -> Self {
        let (title, subtitle) = match document {
            Some(path) => (util::document_title(path), util::document_subtitle(path)),
            None => (DEFAULT_TITLE.to_string(), None),
        };
        DisplayState {
            title,
            subtitle,
            panel: if content_loaded {
                Panel::Content
            } else {
                Panel::Placeholder
            },
            search_enabled: content_loaded,
            search_active: search == SearchState::Active,
        }
    }
}

/// Collaborators handed to the controller at construction.
pub struct Collaborators {
    pub server: Box<dyn DocumentServer>,
    pub recent: Box<dyn RecentDocuments>,
    pub browser: Box<dyn BrowserView>,
    pub surface: Box<dyn WindowSurface>,
}

pub struct WindowController {
    server: Box<dyn DocumentServer>,
    recent: Box<dyn RecentDocuments>,
    browser: Box<dyn BrowserView>,
    surface: Box<dyn WindowSurface>,
    settings: SettingsStore,
    document: Option<PathBuf>,
    content_url: Option<String>,
    search: SearchState,
    destroyed: bool,
}

impl WindowController {
    pub fn new(collaborators: Collaborators, settings: SettingsStore) -> Self {
        let controller = WindowController {
            server: collaborators.server,
            recent: collaborators.recent,
            browser: collaborators.browser,
            surface: collaborators.surface,
            settings,
            document: None,
            content_url: None,
            search: SearchState::Inactive,
            destroyed: false,
        };
        controller.render();
        controller
    }

    pub fn document(&self) -> Option<&Path> {
        self.document.as_deref()
    }

    /// URL currently loaded in the browser view.
    pub fn content_url(&self) -> Option<&str> {
        self.content_url.as_deref()
    }

    pub fn search_state(&self) -> SearchState {
        self.search
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState::derive(
            self.document.as_deref(),
            self.content_url.is_some(),
            self.search,
        )
    }

    fn render(&self) {
        self.surface.render(&self.display_state());
    }

    // ── Document lifecycle ───────────────────────────────────────────────

    /// Open a ledger and ask the server to serve it.
    ///
    /// Absent or non-existent paths are logged and ignored. Returns whether
    /// the document was accepted.
    pub fn open_document(&mut self, path: Option<&Path>) -> bool {
        let Some(path) = path else {
            log::warn!("File could not be opened because no path was given.");
            return false;
        };
        if !path.is_file() {
            log::warn!(
                "File {} could not be opened because it does not exist.",
                path.display()
            );
            return false;
        }

        log::info!("Opening {}", path.display());
        if self.search == SearchState::Active {
            self.stop_search();
        }
        self.document = Some(path.to_path_buf());
        // Pages of a previous document go away with its server.
        self.content_url = None;

        match util::file_path_to_uri(path) {
            Some(uri) => self.recent.add_item(&uri),
            None => log::warn!("Could not build a URI for {}", path.display()),
        }

        // The server reports readiness asynchronously; see `handle_server_event`.
        self.server.start(path);
        self.render();
        true
    }

    /// Open an entry picked from the recent-files menu.
    pub fn open_recent_file(&mut self, uri: &str) -> bool {
        log::info!("Opening recent file {}.", uri);
        let path = PathBuf::from(util::uri_to_file_path(uri));
        self.open_document(Some(&path))
    }

    /// Called right before the recent-files menu is shown.
    pub fn refresh_recent_files(&self) {
        self.recent.refresh();
    }

    /// Dispatch a server notification, dropping events from replaced instances.
    pub fn handle_server_event(&mut self, event: ServerEvent) {
        if event.generation != self.server.generation() {
            log::debug!(
                "Ignoring event from stale server generation {} (current {})",
                event.generation,
                self.server.generation()
            );
            return;
        }
        match event.kind {
            ServerEventKind::Started { url } => self.on_server_started(&url),
            ServerEventKind::Failed { message } => {
                self.on_server_failed(&format!("Could not start Fava: {}", message))
            }
            ServerEventKind::Exited { message } => {
                self.on_server_failed(&format!("Fava stopped: {}", message))
            }
        }
    }

    /// Show the served report pages.
    pub fn on_server_started(&mut self, url: &str) {
        log::info!("Loading {}", url);
        self.browser.load_url(url);
        self.content_url = Some(url.to_string());
        self.render();
    }

    /// Surface a server problem and return to the placeholder.
    pub fn on_server_failed(&mut self, message: &str) {
        log::error!("{}", message);
        self.surface.show_error(message);
        self.close_document();
    }

    /// Close the current document. Idempotent.
    pub fn close_document(&mut self) {
        self.document = None;
        self.content_url = None;
        self.stop_search();
        self.server.stop();
        self.render();
    }

    /// The "close" action: closes the document if one is open, otherwise the
    /// window itself.
    pub fn close_window(&mut self) {
        if self.document.is_some() {
            self.close_document();
        } else {
            self.destroy();
        }
    }

    /// Persist the last used file, stop the server and tear the window down.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        let mut settings = self.settings.load();
        settings.last_used_file = self
            .document
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());
        if let Some((width, height)) = self.surface.size() {
            settings.window_width = width;
            settings.window_height = height;
        }
        if let Err(e) = self.settings.save(&settings) {
            log::error!(
                "Failed to save settings to {}: {}",
                self.settings.path().display(),
                e
            );
        }

        self.close_document();
        self.surface.destroy();
    }

    // ── Search ───────────────────────────────────────────────────────────

    pub fn start_search(&mut self) {
        if self.content_url.is_none() {
            log::debug!("Search requested with no document shown");
            return;
        }
        self.search = SearchState::Active;
        self.render();
        self.surface.focus_search_entry();
    }

    /// Leave search mode and clear highlights. Idempotent.
    pub fn stop_search(&mut self) {
        self.search = SearchState::Inactive;
        self.render();
        self.browser.find_finish();
        self.surface.clear_search_entry();
        self.browser.grab_focus();
    }

    pub fn toggle_search(&mut self, active: bool) {
        if active {
            self.start_search();
        } else {
            self.stop_search();
        }
    }

    pub fn search_changed(&mut self, text: &str) {
        if self.search != SearchState::Active {
            return;
        }
        // An empty term clears highlights rather than searching for "".
        if text.is_empty() {
            self.browser.find_finish();
        } else {
            self.browser.find(text, FindOptions::default(), MAX_MATCH_COUNT);
        }
    }

    pub fn search_next(&mut self) {
        if self.search == SearchState::Active {
            self.browser.find_next();
        }
    }

    pub fn search_previous(&mut self) {
        if self.search == SearchState::Active {
            self.browser.find_previous();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        renders: Vec<DisplayState>,
        starts: Vec<PathBuf>,
        stops: usize,
        running: bool,
        generation: u64,
        recent: Vec<String>,
        refreshes: usize,
        loaded: Vec<String>,
        finds: Vec<(String, FindOptions, u32)>,
        find_next: usize,
        find_previous: usize,
        find_finish: usize,
        content_focus: usize,
        entry_focus: usize,
        entry_clears: usize,
        errors: Vec<String>,
        destroyed: usize,
    }

    #[derive(Clone, Default)]
    struct Fake(Rc<RefCell<Recorder>>);

    impl DocumentServer for Fake {
        fn start(&mut self, path: &Path) {
            let mut r = self.0.borrow_mut();
            r.generation += 1;
            r.running = true;
            r.starts.push(path.to_path_buf());
        }
        fn stop(&mut self) {
            let mut r = self.0.borrow_mut();
            r.generation += 1;
            r.running = false;
            r.stops += 1;
        }
        fn is_running(&self) -> bool {
            self.0.borrow().running
        }
        fn generation(&self) -> u64 {
            self.0.borrow().generation
        }
    }

    impl RecentDocuments for Fake {
        fn add_item(&self, uri: &str) {
            self.0.borrow_mut().recent.push(uri.to_string());
        }
        fn refresh(&self) {
            self.0.borrow_mut().refreshes += 1;
        }
    }

    impl BrowserView for Fake {
        fn load_url(&self, url: &str) {
            self.0.borrow_mut().loaded.push(url.to_string());
        }
        fn find(&self, term: &str, options: FindOptions, max_match_count: u32) {
            self.0
                .borrow_mut()
                .finds
                .push((term.to_string(), options, max_match_count));
        }
        fn find_next(&self) {
            self.0.borrow_mut().find_next += 1;
        }
        fn find_previous(&self) {
            self.0.borrow_mut().find_previous += 1;
        }
        fn find_finish(&self) {
            self.0.borrow_mut().find_finish += 1;
        }
        fn grab_focus(&self) {
            self.0.borrow_mut().content_focus += 1;
        }
    }

    impl WindowSurface for Fake {
        fn render(&self, state: &DisplayState) {
            self.0.borrow_mut().renders.push(state.clone());
        }
        fn focus_search_entry(&self) {
            self.0.borrow_mut().entry_focus += 1;
        }
        fn clear_search_entry(&self) {
            self.0.borrow_mut().entry_clears += 1;
        }
        fn show_error(&self, message: &str) {
            self.0.borrow_mut().errors.push(message.to_string());
        }
        fn size(&self) -> Option<(i32, i32)> {
            Some((1024, 768))
        }
        fn destroy(&self) {
            self.0.borrow_mut().destroyed += 1;
        }
    }

    struct Harness {
        controller: WindowController,
        fake: Fake,
        store: SettingsStore,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = SettingsStore::new(dir.path().join("settings.json"));
            let fake = Fake::default();
            let controller = WindowController::new(
                Collaborators {
                    server: Box::new(fake.clone()),
                    recent: Box::new(fake.clone()),
                    browser: Box::new(fake.clone()),
                    surface: Box::new(fake.clone()),
                },
                store.clone(),
            );
            Harness {
                controller,
                fake,
                store,
                dir,
            }
        }

        fn ledger(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, "2024-01-01 open Assets:Cash\n").unwrap();
            path
        }

        fn rendered(&self) -> DisplayState {
            self.fake.0.borrow().renders.last().cloned().unwrap()
        }

        /// Open a ledger and deliver the matching start notification.
        fn open_and_start(&mut self, name: &str) -> PathBuf {
            let path = self.ledger(name);
            assert!(self.controller.open_document(Some(&path)));
            let generation = self.fake.generation();
            self.controller.handle_server_event(ServerEvent {
                generation,
                kind: ServerEventKind::Started {
                    url: "http://127.0.0.1:5000/".to_string(),
                },
            });
            path
        }
    }

    #[test]
    fn initial_state_is_placeholder() {
        let h = Harness::new();
        let state = h.rendered();
        assert_eq!(state.title, DEFAULT_TITLE);
        assert_eq!(state.subtitle, None);
        assert_eq!(state.panel, Panel::Placeholder);
        assert!(!state.search_enabled);
        assert!(!state.search_active);
    }

    #[test]
    fn open_none_is_a_no_op() {
        let mut h = Harness::new();
        let renders_before = h.fake.0.borrow().renders.len();
        assert!(!h.controller.open_document(None));
        assert!(h.controller.document().is_none());
        assert!(h.fake.0.borrow().starts.is_empty());
        assert_eq!(h.fake.0.borrow().renders.len(), renders_before);
    }

    #[test]
    fn open_missing_file_is_a_no_op() {
        let mut h = Harness::new();
        let missing = h.dir.path().join("missing.beancount");
        assert!(!h.controller.open_document(Some(&missing)));
        assert!(h.controller.document().is_none());
        assert!(h.fake.0.borrow().starts.is_empty());
        assert!(h.fake.0.borrow().recent.is_empty());
    }

    #[test]
    fn open_directory_is_rejected() {
        let mut h = Harness::new();
        let dir = h.dir.path().to_path_buf();
        assert!(!h.controller.open_document(Some(&dir)));
        assert!(h.fake.0.borrow().starts.is_empty());
    }

    #[test]
    fn open_missing_keeps_previous_document() {
        let mut h = Harness::new();
        let path = h.ledger("main.beancount");
        h.controller.open_document(Some(&path));
        let missing = h.dir.path().join("gone.beancount");
        h.controller.open_document(Some(&missing));
        assert_eq!(h.controller.document(), Some(path.as_path()));
        assert_eq!(h.fake.0.borrow().starts.len(), 1);
    }

    #[test]
    fn open_valid_file_sets_titles_and_recent() {
        let mut h = Harness::new();
        let path = h.ledger("ledger.beancount");
        assert!(h.controller.open_document(Some(&path)));

        let state = h.rendered();
        assert_eq!(state.title, "ledger.beancount");
        assert_eq!(
            state.subtitle.as_deref(),
            Some(&*h.dir.path().to_string_lossy())
        );
        let expected_uri = util::file_path_to_uri(&path).unwrap();
        assert_eq!(h.fake.0.borrow().recent, vec![expected_uri]);
        assert_eq!(h.fake.0.borrow().starts, vec![path]);
        // Content is not shown until the server reports readiness.
        assert_eq!(state.panel, Panel::Placeholder);
        assert!(!state.search_enabled);
    }

    #[test]
    fn sandbox_document_has_no_subtitle() {
        let state = DisplayState::derive(
            Some(Path::new("/run/user/1000/doc123/ledger.beancount")),
            false,
            SearchState::Inactive,
        );
        assert_eq!(state.title, "ledger.beancount");
        assert_eq!(state.subtitle, None);
    }

    #[test]
    fn tmp_document_titles() {
        let state = DisplayState::derive(
            Some(Path::new("/tmp/ledger.beancount")),
            false,
            SearchState::Inactive,
        );
        assert_eq!(state.title, "ledger.beancount");
        assert_eq!(state.subtitle.as_deref(), Some("/tmp"));
    }

    #[test]
    fn server_started_shows_content_and_enables_search() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");

        let state = h.rendered();
        assert_eq!(state.panel, Panel::Content);
        assert!(state.search_enabled);
        assert_eq!(h.fake.0.borrow().loaded, vec!["http://127.0.0.1:5000/"]);
        assert_eq!(h.controller.content_url(), Some("http://127.0.0.1:5000/"));
    }

    #[test]
    fn server_started_always_yields_content_state() {
        let mut h = Harness::new();
        h.controller.on_server_started("http://127.0.0.1:5001/");
        let state = h.rendered();
        assert_eq!(state.panel, Panel::Content);
        assert!(state.search_enabled);
    }

    #[test]
    fn stale_server_event_is_ignored() {
        let mut h = Harness::new();
        let path = h.ledger("main.beancount");
        h.controller.open_document(Some(&path));
        let stale = h.fake.generation();
        h.controller.close_document();

        h.controller.handle_server_event(ServerEvent {
            generation: stale,
            kind: ServerEventKind::Started {
                url: "http://127.0.0.1:5000/".to_string(),
            },
        });
        assert_eq!(h.rendered().panel, Panel::Placeholder);
        assert!(h.fake.0.borrow().loaded.is_empty());
    }

    #[test]
    fn failed_start_surfaces_error_and_resets() {
        let mut h = Harness::new();
        let path = h.ledger("main.beancount");
        h.controller.open_document(Some(&path));
        let generation = h.fake.generation();
        h.controller.handle_server_event(ServerEvent {
            generation,
            kind: ServerEventKind::Failed {
                message: "port in use".to_string(),
            },
        });

        assert!(h.controller.document().is_none());
        let state = h.rendered();
        assert_eq!(state.panel, Panel::Placeholder);
        assert!(!state.search_enabled);
        assert_eq!(state.title, DEFAULT_TITLE);
        let errors = h.fake.0.borrow().errors.clone();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("port in use"));
        assert!(!h.fake.is_running());
    }

    #[test]
    fn exited_after_start_surfaces_error_and_resets() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        assert_eq!(h.rendered().panel, Panel::Content);
        h.controller.start_search();

        let generation = h.fake.generation();
        h.controller.handle_server_event(ServerEvent {
            generation,
            kind: ServerEventKind::Exited {
                message: "Fava exited (exit status: 1)".to_string(),
            },
        });

        assert!(h.controller.document().is_none());
        assert!(h.controller.content_url().is_none());
        assert_eq!(h.controller.search_state(), SearchState::Inactive);
        let state = h.rendered();
        assert_eq!(state.panel, Panel::Placeholder);
        assert!(!state.search_enabled);
        assert!(!state.search_active);
        assert_eq!(state.title, DEFAULT_TITLE);
        let errors = h.fake.0.borrow().errors.clone();
        assert_eq!(errors, vec!["Fava stopped: Fava exited (exit status: 1)"]);
        assert!(!h.fake.is_running());
    }

    #[test]
    fn reopen_drops_events_from_previous_document() {
        let mut h = Harness::new();
        let first = h.open_and_start("first.beancount");
        let first_generation = h.fake.generation();
        h.controller.start_search();

        let second = h.ledger("second.beancount");
        assert!(h.controller.open_document(Some(&second)));
        let second_generation = h.fake.generation();
        assert_ne!(first_generation, second_generation);

        // The first document's pages are gone until the new server is ready.
        let state = h.rendered();
        assert_eq!(state.title, "second.beancount");
        assert_eq!(state.panel, Panel::Placeholder);
        assert!(!state.search_enabled);
        assert!(!state.search_active);
        assert!(h.controller.content_url().is_none());

        // A late exit notification from the first server changes nothing.
        h.controller.handle_server_event(ServerEvent {
            generation: first_generation,
            kind: ServerEventKind::Exited {
                message: "Fava exited (signal: 9)".to_string(),
            },
        });
        assert_eq!(h.controller.document(), Some(second.as_path()));
        assert!(h.fake.0.borrow().errors.is_empty());
        assert_eq!(h.rendered().panel, Panel::Placeholder);

        h.controller.handle_server_event(ServerEvent {
            generation: second_generation,
            kind: ServerEventKind::Started {
                url: "http://127.0.0.1:5001/".to_string(),
            },
        });
        assert_eq!(
            h.fake.0.borrow().loaded,
            vec!["http://127.0.0.1:5000/", "http://127.0.0.1:5001/"]
        );
        assert_eq!(h.controller.content_url(), Some("http://127.0.0.1:5001/"));
        let state = h.rendered();
        assert_eq!(state.panel, Panel::Content);
        assert_eq!(state.title, "second.beancount");
        assert_eq!(h.fake.0.borrow().starts, vec![first, second]);
    }

    #[test]
    fn close_document_is_idempotent() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");

        h.controller.close_document();
        let once = h.rendered();
        h.controller.close_document();
        let twice = h.rendered();

        assert_eq!(once, twice);
        assert_eq!(once.title, DEFAULT_TITLE);
        assert_eq!(once.subtitle, None);
        assert_eq!(once.panel, Panel::Placeholder);
        assert!(!once.search_enabled);
        assert!(h.controller.document().is_none());
    }

    #[test]
    fn close_document_without_document_is_safe() {
        let mut h = Harness::new();
        h.controller.close_document();
        assert_eq!(h.rendered().panel, Panel::Placeholder);
        assert_eq!(h.fake.0.borrow().stops, 1);
    }

    #[test]
    fn close_during_search_stops_search() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();
        assert_eq!(h.controller.search_state(), SearchState::Active);

        h.controller.close_document();

        assert_eq!(h.controller.search_state(), SearchState::Inactive);
        let state = h.rendered();
        assert!(!state.search_active);
        assert!(!state.search_enabled);
        assert_eq!(state.panel, Panel::Placeholder);
        assert!(h.fake.0.borrow().find_finish >= 1);
    }

    #[test]
    fn close_window_with_document_only_closes_document() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.close_window();

        assert!(!h.controller.is_destroyed());
        assert_eq!(h.fake.0.borrow().destroyed, 0);
        assert!(h.controller.document().is_none());
        assert!(!h.fake.is_running());
    }

    #[test]
    fn close_window_without_document_destroys() {
        let mut h = Harness::new();
        h.controller.close_window();

        assert!(h.controller.is_destroyed());
        assert_eq!(h.fake.0.borrow().destroyed, 1);
        assert_eq!(h.store.load().last_used_file, None);
    }

    #[test]
    fn destroy_persists_last_used_file_and_stops_server() {
        let mut h = Harness::new();
        let path = h.open_and_start("main.beancount");
        h.controller.destroy();

        let saved = h.store.load();
        assert_eq!(
            saved.last_used_file.as_deref(),
            Some(&*path.to_string_lossy())
        );
        assert_eq!(saved.window_width, 1024);
        assert_eq!(saved.window_height, 768);
        assert!(!h.fake.is_running());
        assert_eq!(h.fake.0.borrow().destroyed, 1);

        // A second destroy (e.g. from the window manager) is ignored.
        h.controller.destroy();
        assert_eq!(h.fake.0.borrow().destroyed, 1);
    }

    #[test]
    fn open_recent_file_decodes_uri() {
        let mut h = Harness::new();
        let path = h.ledger("my books.beancount");
        let uri = util::file_path_to_uri(&path).unwrap();
        assert!(uri.contains("%20"));

        assert!(h.controller.open_recent_file(&uri));
        assert_eq!(h.controller.document(), Some(path.as_path()));
    }

    #[test]
    fn open_recent_file_rejects_non_file_uri() {
        let mut h = Harness::new();
        assert!(!h.controller.open_recent_file("https://example.com/ledger.beancount"));
        assert!(!h.controller.open_recent_file("file:///definitely/missing.beancount"));
        assert!(h.fake.0.borrow().starts.is_empty());
    }

    #[test]
    fn refresh_recent_files_forwards() {
        let h = Harness::new();
        h.controller.refresh_recent_files();
        h.controller.refresh_recent_files();
        assert_eq!(h.fake.0.borrow().refreshes, 2);
    }

    #[test]
    fn search_cannot_start_without_document() {
        let mut h = Harness::new();
        h.controller.start_search();
        assert_eq!(h.controller.search_state(), SearchState::Inactive);
        assert_eq!(h.fake.0.borrow().entry_focus, 0);
    }

    #[test]
    fn start_search_shows_and_focuses_entry() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();

        let state = h.rendered();
        assert!(state.search_active);
        assert_eq!(h.fake.0.borrow().entry_focus, 1);
    }

    #[test]
    fn stop_search_finishes_clears_and_refocuses() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.toggle_search(true);
        let before = {
            let r = h.fake.0.borrow();
            (r.find_finish, r.entry_clears, r.content_focus)
        };
        h.controller.toggle_search(false);

        let r = h.fake.0.borrow();
        assert_eq!(r.find_finish, before.0 + 1);
        assert_eq!(r.entry_clears, before.1 + 1);
        assert_eq!(r.content_focus, before.2 + 1);
        assert!(!r.renders.last().unwrap().search_active);
    }

    #[test]
    fn stop_search_is_idempotent() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();
        h.controller.stop_search();
        let once = h.rendered();
        h.controller.stop_search();
        assert_eq!(h.rendered(), once);
        assert_eq!(h.controller.search_state(), SearchState::Inactive);
    }

    #[test]
    fn search_text_runs_capped_case_insensitive_search() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();
        h.controller.search_changed("Expenses");

        let finds = h.fake.0.borrow().finds.clone();
        assert_eq!(
            finds,
            vec![(
                "Expenses".to_string(),
                FindOptions {
                    case_insensitive: true,
                    wrap_around: true
                },
                MAX_MATCH_COUNT
            )]
        );
        assert_eq!(MAX_MATCH_COUNT, 32);
    }

    #[test]
    fn search_text_ignored_while_inactive() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.search_changed("Expenses");
        h.controller.search_next();
        h.controller.search_previous();

        let r = h.fake.0.borrow();
        assert!(r.finds.is_empty());
        assert_eq!(r.find_next, 0);
        assert_eq!(r.find_previous, 0);
    }

    #[test]
    fn empty_search_text_finishes_session() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();
        let before = h.fake.0.borrow().find_finish;
        h.controller.search_changed("");
        assert_eq!(h.fake.0.borrow().find_finish, before + 1);
        assert!(h.fake.0.borrow().finds.is_empty());
    }

    #[test]
    fn match_navigation_delegates_while_active() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();
        h.controller.search_next();
        h.controller.search_next();
        h.controller.search_previous();

        let r = h.fake.0.borrow();
        assert_eq!(r.find_next, 2);
        assert_eq!(r.find_previous, 1);
    }

    #[test]
    fn rendered_state_always_matches_derived_state() {
        let mut h = Harness::new();
        h.open_and_start("main.beancount");
        h.controller.start_search();
        assert_eq!(h.rendered(), h.controller.display_state());
        h.controller.close_document();
        assert_eq!(h.rendered(), h.controller.display_state());

        for state in h.fake.0.borrow().renders.iter() {
            // Toggle and bar visibility come from one field, and search can
            // only be active while it is enabled.
            assert!(!state.search_active || state.search_enabled);
        }
    }
}
