mod browser;
mod widget_tree;
mod window;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use gtk4::gio;
use libadwaita as adw;
use libadwaita::prelude::*;

use fava_desktop_core::settings::SettingsStore;

const APP_ID: &str = "org.beancount.FavaDesktop";

const ACCELS: &[(&str, &[&str])] = &[
    ("win.file-open", &["<Ctrl>o"]),
    ("win.close", &["<Ctrl>w"]),
    ("win.search", &["<Ctrl>f"]),
    ("win.search-next", &["<Ctrl>g"]),
    ("win.search-previous", &["<Ctrl><Shift>g"]),
];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = adw::Application::builder()
        .application_id(APP_ID)
        .flags(gio::ApplicationFlags::HANDLES_OPEN)
        .build();

    app.connect_startup(|app| {
        for (action, accels) in ACCELS {
            app.set_accels_for_action(action, accels);
        }
    });

    let main_window: Rc<RefCell<Option<window::FavaWindow>>> = Rc::new(RefCell::new(None));

    {
        let main_window = main_window.clone();
        app.connect_activate(move |app| {
            let Some((window, created)) = ensure_window(app, &main_window) else {
                return;
            };
            if created {
                let store = SettingsStore::default_location();
                if let Some(path) = store.load().last_used_file {
                    log::info!("Reopening last used file {}", path);
                    window.open(Path::new(&path));
                }
            }
            window.present();
        });
    }

    {
        let main_window = main_window.clone();
        app.connect_open(move |app, files, _hint| {
            let Some((window, _)) = ensure_window(app, &main_window) else {
                return;
            };
            match files.first().and_then(|file| file.path()) {
                Some(path) => window.open(&path),
                None => log::warn!("Ignoring request to open a non-local file"),
            }
            window.present();
        });
    }

    app.run();

    // Dropping the window stops any server that is still running.
    main_window.borrow_mut().take();
}

/// Return the main window, building it on first use or after it was closed.
fn ensure_window(
    app: &adw::Application,
    main_window: &Rc<RefCell<Option<window::FavaWindow>>>,
) -> Option<(window::FavaWindow, bool)> {
    if let Some(window) = main_window.borrow().as_ref() {
        if !window.is_destroyed() {
            return Some((window.clone(), false));
        }
    }

    let store = SettingsStore::default_location();
    let settings = store.load();
    match window::build_window(app, &settings, store) {
        Ok(window) => {
            *main_window.borrow_mut() = Some(window.clone());
            Some((window, true))
        }
        Err(e) => {
            log::error!("Failed to create the main window: {}", e);
            app.quit();
            None
        }
    }
}
