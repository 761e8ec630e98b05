use std::cell::RefCell;
use std::rc::Rc;

use gtk4::gio;
use gtk4::prelude::*;
use webkit6::prelude::*;

use fava_desktop_core::util;
use fava_desktop_core::window::{BrowserView, FindOptions};

/// The WebKit view showing Fava, with its find controller.
pub struct WebKitBrowser {
    webview: webkit6::WebView,
    base_url: Rc<RefCell<Option<String>>>,
}

impl WebKitBrowser {
    pub fn new() -> Self {
        let webview = webkit6::WebView::builder()
            .hexpand(true)
            .vexpand(true)
            .build();

        if let Some(wk_settings) = webkit6::prelude::WebViewExt::settings(&webview) {
            wk_settings.set_enable_javascript(true);
            wk_settings.set_enable_developer_extras(true);
        }

        let base_url: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        connect_external_links(&webview, &base_url);

        WebKitBrowser { webview, base_url }
    }

    pub fn widget(&self) -> &webkit6::WebView {
        &self.webview
    }
}

impl BrowserView for WebKitBrowser {
    fn load_url(&self, url: &str) {
        *self.base_url.borrow_mut() = Some(url.to_string());
        self.webview.load_uri(url);
    }

    fn find(&self, term: &str, options: FindOptions, max_match_count: u32) {
        if let Some(find_controller) = self.webview.find_controller() {
            find_controller.search(term, find_flags(options).bits(), max_match_count);
        }
    }

    fn find_next(&self) {
        if let Some(find_controller) = self.webview.find_controller() {
            find_controller.search_next();
        }
    }

    fn find_previous(&self) {
        if let Some(find_controller) = self.webview.find_controller() {
            find_controller.search_previous();
        }
    }

    fn find_finish(&self) {
        if let Some(find_controller) = self.webview.find_controller() {
            find_controller.search_finish();
        }
    }

    fn grab_focus(&self) {
        self.webview.grab_focus();
    }
}

fn find_flags(options: FindOptions) -> webkit6::FindOptions {
    let mut flags = webkit6::FindOptions::empty();
    if options.case_insensitive {
        flags |= webkit6::FindOptions::CASE_INSENSITIVE;
    }
    if options.wrap_around {
        flags |= webkit6::FindOptions::WRAP_AROUND;
    }
    flags
}

/// Send links that leave the Fava server to the default browser. New-window
/// requests for Fava pages are loaded in place.
fn connect_external_links(webview: &webkit6::WebView, base_url: &Rc<RefCell<Option<String>>>) {
    let base_url = base_url.clone();
    webview.connect_decide_policy(move |webview, decision, decision_type| {
        let new_window = match decision_type {
            webkit6::PolicyDecisionType::NavigationAction => false,
            webkit6::PolicyDecisionType::NewWindowAction => true,
            _ => return false,
        };
        let Some(navigation) = decision.downcast_ref::<webkit6::NavigationPolicyDecision>() else {
            return false;
        };
        let Some(mut action) = navigation.navigation_action() else {
            return false;
        };
        let Some(uri) = action.request().and_then(|request| request.uri()) else {
            return false;
        };

        if util::is_external_link(&uri, base_url.borrow().as_deref()) {
            log::info!("Opening external link {}", uri);
            if let Err(e) =
                gio::AppInfo::launch_default_for_uri(&uri, None::<&gio::AppLaunchContext>)
            {
                log::warn!("Failed to open {}: {}", uri, e);
            }
            decision.ignore();
            return true;
        }
        if new_window {
            decision.ignore();
            webview.load_uri(&uri);
            return true;
        }
        false
    });
}
