use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::server::ServerConfig;

/// How the Fava server is launched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    /// Executable to run, looked up on `PATH` unless it contains a separator.
    pub command: String,
    /// Arguments; `{host}`, `{port}` and `{file}` are substituted at start.
    pub args: Vec<String>,
    pub host: String,
    pub startup_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let config = ServerConfig::default();
        ServerSettings {
            command: config.command,
            args: config.args,
            host: config.host,
            startup_timeout_secs: config.startup_timeout.as_secs(),
        }
    }
}

impl ServerSettings {
    pub fn to_config(&self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            command: self.command.clone(),
            args: self.args.clone(),
            host: self.host.clone(),
            startup_timeout: std::time::Duration::from_secs(self.startup_timeout_secs.max(1)),
            poll_interval: defaults.poll_interval,
        }
    }
}

/// Application settings, persisted to `~/.config/fava-desktop/settings.json`.
///
/// `#[serde(default)]` fills fields missing from an older settings file with
/// their `Default` values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // ── Window ───────────────────────────────────────────────────────────
    pub window_width: i32,
    pub window_height: i32,
    /// Ledger that was open when the window was last destroyed.
    pub last_used_file: Option<String>,

    // ── Server ───────────────────────────────────────────────────────────
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            window_width: 1200,
            window_height: 800,
            last_used_file: None,
            server: ServerSettings::default(),
        }
    }
}

/// Loads and saves [`Settings`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    /// Store under the user's config directory, falling back to
    /// `$HOME/.config` when the platform directory is unknown.
    pub fn default_location() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
        SettingsStore::new(config_dir.join("fava-desktop").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read settings; a missing or unparsable file yields defaults.
    pub fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!(
                    "Ignoring malformed settings file {}: {}",
                    self.path.display(),
                    e
                );
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), String> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }
}
