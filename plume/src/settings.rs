use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::StoreOptions;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000/api";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    /// Upper bound on concurrent gateway calls fanned out by one intent
    pub request_concurrency: usize,
    pub decorate_reactions: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub feed: FeedSettings,
}

impl Settings {
    /// Load settings from the default locations and the environment.
    ///
    /// Priority, lowest first: built-in defaults, `plume.toml` in the working
    /// directory, `settings.toml` in the user config directory, then
    /// `PLUME_SERVER_URL`, `PLUME_SESSION_TOKEN` and `PLUME_TIMEOUT_SECS`.
    pub fn new() -> Result<Self, ConfigError> {
        let mut files = vec![PathBuf::from("plume.toml")];
        if let Some(user_file) = user_settings_file() {
            files.push(user_file);
        }

        let mut overrides = Vec::new();
        if let Ok(url) = std::env::var("PLUME_SERVER_URL") {
            overrides.push(("server.url", url));
        }
        if let Ok(token) = std::env::var("PLUME_SESSION_TOKEN") {
            overrides.push(("server.session_token", token));
        }
        if let Ok(timeout) = std::env::var("PLUME_TIMEOUT_SECS") {
            overrides.push(("server.timeout_secs", timeout));
        }

        Self::load(&files, &overrides)
    }

    /// Load from explicit files (missing ones are skipped) plus overrides
    pub fn load(files: &[PathBuf], overrides: &[(&str, String)]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.url", DEFAULT_SERVER_URL)?
            .set_default("server.timeout_secs", 15)?
            .set_default("feed.request_concurrency", 8)?
            .set_default("feed.decorate_reactions", true)?;

        for path in files.iter().filter(|path| path.exists()) {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            decorate_reactions: self.feed.decorate_reactions,
            request_concurrency: self.feed.request_concurrency.max(1),
        }
    }
}

fn user_settings_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| settings_file_in(&dir))
}

fn settings_file_in(config_dir: &Path) -> PathBuf {
    config_dir.join("plume").join("settings.toml")
}
