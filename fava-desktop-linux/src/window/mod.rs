mod recent_menu;
mod surface;

use gtk4::gio;
use gtk4::glib;
use gtk4::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use fava_desktop_core::server::FavaServer;
use fava_desktop_core::settings::{Settings, SettingsStore};
use fava_desktop_core::util::LEDGER_EXTENSIONS;
use fava_desktop_core::window::{Collaborators, WindowController, DEFAULT_TITLE};

use crate::browser::WebKitBrowser;
use crate::widget_tree;

use self::recent_menu::GtkRecentDocuments;
use self::surface::{GtkSurface, CONTENT_PAGE, PLACEHOLDER_PAGE};

/// Handle to the main window and its controller.
#[derive(Clone)]
pub struct FavaWindow {
    window: adw::ApplicationWindow,
    controller: Rc<RefCell<WindowController>>,
}

impl FavaWindow {
    pub fn present(&self) {
        self.window.present();
    }

    pub fn open(&self, path: &Path) {
        with_controller(&self.controller, "open", |c| {
            c.open_document(Some(path));
        });
    }

    pub fn is_destroyed(&self) -> bool {
        self.controller
            .try_borrow()
            .map(|c| c.is_destroyed())
            .unwrap_or(false)
    }
}

pub fn build_window(
    app: &adw::Application,
    settings: &Settings,
    store: SettingsStore,
) -> Result<FavaWindow, String> {
    let (server, mut server_events) = FavaServer::new(settings.server.to_config())?;

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title(DEFAULT_TITLE)
        .default_width(settings.window_width)
        .default_height(settings.window_height)
        .build();

    // Main vertical layout
    let main_box = gtk4::Box::new(gtk4::Orientation::Vertical, 0);

    // Header bar with document title and subtitle
    let header = adw::HeaderBar::new();
    let window_title = adw::WindowTitle::new(DEFAULT_TITLE, "");
    header.set_title_widget(Some(&window_title));

    let open_btn = gtk4::Button::from_icon_name("document-open-symbolic");
    open_btn.set_tooltip_text(Some("Open Ledger (Ctrl+O)"));
    open_btn.set_action_name(Some("win.file-open"));
    header.pack_start(&open_btn);

    let recent_btn = gtk4::MenuButton::new();
    recent_btn.set_icon_name("document-open-recent-symbolic");
    recent_btn.set_tooltip_text(Some("Recent Files"));
    header.pack_start(&recent_btn);

    let search_btn = gtk4::ToggleButton::new();
    search_btn.set_icon_name("system-search-symbolic");
    search_btn.set_tooltip_text(Some("Find in Page (Ctrl+F)"));
    search_btn.set_action_name(Some("win.search-toggle"));
    header.pack_end(&search_btn);

    main_box.append(&header);

    // Placeholder shown while no ledger is open
    let open_placeholder_btn = gtk4::Button::with_label("Open Ledger…");
    open_placeholder_btn.set_halign(gtk4::Align::Center);
    open_placeholder_btn.add_css_class("pill");
    open_placeholder_btn.add_css_class("suggested-action");
    open_placeholder_btn.set_action_name(Some("win.file-open"));
    let placeholder = adw::StatusPage::builder()
        .icon_name("x-office-spreadsheet-symbolic")
        .title("No Ledger Open")
        .description("Open a Beancount file to browse its reports with Fava.")
        .child(&open_placeholder_btn)
        .build();

    // Content: search bar above the web view
    let browser = WebKitBrowser::new();
    let search_bar = build_search_bar();
    let search_entry = widget_tree::find_descendant::<gtk4::SearchEntry>(&search_bar)
        .ok_or_else(|| "search bar has no search entry".to_string())?;

    let content_box = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    content_box.append(&search_bar);
    content_box.append(browser.widget());

    let stack = gtk4::Stack::new();
    stack.set_vexpand(true);
    stack.set_transition_type(gtk4::StackTransitionType::Crossfade);
    stack.add_named(&placeholder, Some(PLACEHOLDER_PAGE));
    stack.add_named(&content_box, Some(CONTENT_PAGE));
    main_box.append(&stack);

    let toast_overlay = adw::ToastOverlay::new();
    toast_overlay.set_child(Some(&main_box));
    window.set_content(Some(&toast_overlay));

    // --- Actions ---
    let open_action = gio::SimpleAction::new("file-open", None);
    let close_action = gio::SimpleAction::new("close", None);
    let search_action = gio::SimpleAction::new("search", None);
    let search_toggle_action =
        gio::SimpleAction::new_stateful("search-toggle", None, &false.to_variant());
    let search_next_action = gio::SimpleAction::new("search-next", None);
    let search_previous_action = gio::SimpleAction::new("search-previous", None);
    let open_recent_action =
        gio::SimpleAction::new("open-recent", Some(glib::VariantTy::STRING));

    let recent_manager = gtk4::RecentManager::default();
    let surface = GtkSurface {
        window: window.clone(),
        window_title,
        stack,
        search_bar,
        search_entry: search_entry.clone(),
        search_action: search_action.clone(),
        search_toggle_action: search_toggle_action.clone(),
        toast_overlay,
    };
    let controller = Rc::new(RefCell::new(WindowController::new(
        Collaborators {
            server: Box::new(server),
            recent: Box::new(GtkRecentDocuments::new(recent_manager.clone())),
            browser: Box::new(browser),
            surface: Box::new(surface),
        },
        store,
    )));

    {
        let window_ref = window.clone();
        let controller = controller.clone();
        open_action.connect_activate(move |_, _| {
            show_file_open_dialog(&window_ref, &controller);
        });
    }
    {
        let controller = controller.clone();
        close_action.connect_activate(move |_, _| {
            with_controller(&controller, "close", |c| c.close_window());
        });
    }
    {
        let controller = controller.clone();
        search_action.connect_activate(move |_, _| {
            with_controller(&controller, "search", |c| c.start_search());
        });
    }
    {
        let controller = controller.clone();
        search_toggle_action.connect_change_state(move |_, value| {
            if let Some(active) = value.and_then(|v| v.get::<bool>()) {
                with_controller(&controller, "search-toggle", |c| c.toggle_search(active));
            }
        });
    }
    {
        let controller = controller.clone();
        search_next_action.connect_activate(move |_, _| {
            with_controller(&controller, "search-next", |c| c.search_next());
        });
    }
    {
        let controller = controller.clone();
        search_previous_action.connect_activate(move |_, _| {
            with_controller(&controller, "search-previous", |c| c.search_previous());
        });
    }
    {
        let controller = controller.clone();
        open_recent_action.connect_activate(move |_, parameter| {
            match parameter.and_then(|p| p.get::<String>()) {
                Some(uri) => with_controller(&controller, "open-recent", |c| {
                    c.open_recent_file(&uri);
                }),
                None => log::warn!("open-recent activated without a URI"),
            }
        });
    }
    for action in [
        &open_action,
        &close_action,
        &search_action,
        &search_toggle_action,
        &search_next_action,
        &search_previous_action,
        &open_recent_action,
    ] {
        window.add_action(action);
    }

    // Rebuild the recent-files menu every time it is about to be shown
    {
        let controller = controller.clone();
        recent_btn.set_create_popup_func(Some(move |btn: &gtk4::MenuButton| {
            with_controller(&controller, "recent-popup", |c| c.refresh_recent_files());
            btn.set_menu_model(Some(&recent_menu::build_menu(&recent_manager)));
        }));
    }

    // --- Search entry wiring ---
    {
        let controller = controller.clone();
        search_entry.connect_search_changed(move |entry| {
            let text = entry.text().to_string();
            with_controller(&controller, "search-changed", |c| c.search_changed(&text));
        });
    }
    {
        let controller = controller.clone();
        search_entry.connect_next_match(move |_| {
            with_controller(&controller, "next-match", |c| c.search_next());
        });
    }
    {
        let controller = controller.clone();
        search_entry.connect_activate(move |_| {
            with_controller(&controller, "search-activate", |c| c.search_next());
        });
    }
    {
        let controller = controller.clone();
        search_entry.connect_previous_match(move |_| {
            with_controller(&controller, "previous-match", |c| c.search_previous());
        });
    }
    {
        let controller = controller.clone();
        search_entry.connect_stop_search(move |_| {
            with_controller(&controller, "stop-search", |c| c.stop_search());
        });
    }

    // Deliver server notifications on the main loop
    {
        let controller = Rc::downgrade(&controller);
        glib::spawn_future_local(async move {
            while let Some(event) = server_events.recv().await {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                with_controller(&controller, "server-event", |c| c.handle_server_event(event));
            }
        });
    }

    // Window manager close: persist settings and stop the server
    {
        let controller = controller.clone();
        window.connect_close_request(move |_| {
            let mut destroyed = false;
            with_controller(&controller, "close-request", |c| {
                c.destroy();
                destroyed = true;
            });
            if destroyed {
                glib::Propagation::Stop
            } else {
                glib::Propagation::Proceed
            }
        });
    }

    Ok(FavaWindow { window, controller })
}

fn build_search_bar() -> gtk4::SearchBar {
    let search_bar = gtk4::SearchBar::new();
    search_bar.set_show_close_button(false);

    let bar_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);

    let entry = gtk4::SearchEntry::new();
    entry.set_placeholder_text(Some("Find in page..."));
    entry.set_width_chars(32);

    let prev_btn = gtk4::Button::from_icon_name("go-up-symbolic");
    prev_btn.set_tooltip_text(Some("Previous Match (Ctrl+Shift+G)"));
    prev_btn.set_action_name(Some("win.search-previous"));
    let next_btn = gtk4::Button::from_icon_name("go-down-symbolic");
    next_btn.set_tooltip_text(Some("Next Match (Ctrl+G)"));
    next_btn.set_action_name(Some("win.search-next"));

    bar_box.append(&entry);
    bar_box.append(&prev_btn);
    bar_box.append(&next_btn);
    search_bar.set_child(Some(&bar_box));
    search_bar
}

fn show_file_open_dialog(
    window: &adw::ApplicationWindow,
    controller: &Rc<RefCell<WindowController>>,
) {
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Beancount Files"));
    for ext in LEDGER_EXTENSIONS {
        filter.add_suffix(ext);
    }
    let filters = gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&filter);

    let dialog = gtk4::FileDialog::builder()
        .title("Open Ledger")
        .modal(true)
        .filters(&filters)
        .default_filter(&filter)
        .build();

    let current_dir = controller
        .try_borrow()
        .ok()
        .and_then(|c| c.document().and_then(Path::parent).map(Path::to_path_buf));
    if let Some(dir) = current_dir {
        dialog.set_initial_folder(Some(&gio::File::for_path(dir)));
    }

    let controller = controller.clone();
    dialog.open(Some(window), gio::Cancellable::NONE, move |result| match result {
        Ok(file) => {
            let path = file.path();
            log::info!("User chose file {:?}.", path);
            with_controller(&controller, "file-open", |c| {
                c.open_document(path.as_deref());
            });
        }
        Err(e) => log::debug!("File dialog closed without a selection: {}", e),
    });
}

/// Run `f` against the controller from a signal handler.
///
/// Handlers that fire while the controller is already borrowed (a widget
/// emitting synchronously during a render) are dropped.
fn with_controller<F: FnOnce(&mut WindowController)>(
    controller: &RefCell<WindowController>,
    label: &str,
    f: F,
) {
    run_guarded_ui(label, || match controller.try_borrow_mut() {
        Ok(mut c) => f(&mut c),
        Err(_) => log::debug!("Ignoring re-entrant '{}' while the window is busy", label),
    });
}

fn run_guarded_ui<F: FnOnce()>(label: &str, f: F) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            *s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "non-string panic payload"
        };
        log::error!("UI callback panic in '{}': {}", label, msg);
    }
}
