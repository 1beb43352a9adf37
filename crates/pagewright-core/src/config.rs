//! Persistent configuration for pagewright.
//!
//! Stores user settings in `~/.pagewright/config.json`: polling intervals and
//! timeouts for the session's waits, and the system alert monitors.
//!
//! # Example
//!
//! ```no_run
//! use pagewright_core::config::PagewrightConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = PagewrightConfig::load();
//! println!("waiting up to {:?}", config.wait_timeout());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_DIRNAME: &str = ".pagewright";
const CONFIG_FILENAME: &str = "config.json";

/// Returns the pagewright directory (`~/.pagewright/`).
pub fn pagewright_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIRNAME)
}

/// Persistent pagewright configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagewrightConfig {
    /// Default timeout of existence and hittability waits.
    pub wait_timeout_ms: u64,
    /// Interval between resolution passes while waiting.
    pub poll_interval_ms: u64,
    /// How long to wait for an element's frame to settle before a tap.
    pub stable_timeout_ms: u64,
    /// Interval between frame samples while waiting for a stable position.
    pub stable_poll_interval_ms: u64,
    /// Register monitors that dismiss system alerts.
    pub default_monitors: bool,
    /// Label of the permission dialogue's decline button.
    pub permission_deny_label: String,
}

impl Default for PagewrightConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 10_000,
            poll_interval_ms: 1_000,
            stable_timeout_ms: 2_000,
            stable_poll_interval_ms: 100,
            default_monitors: true,
            permission_deny_label: "Don\u{2019}t Allow".to_string(),
        }
    }
}

impl PagewrightConfig {
    /// Load config from `~/.pagewright/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&pagewright_dir().join(CONFIG_FILENAME))
    }

    /// Load config from an explicit file, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.pagewright/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let dir = pagewright_dir();
        std::fs::create_dir_all(&dir)?;
        self.save_to(&dir.join(CONFIG_FILENAME))
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stable_timeout(&self) -> Duration {
        Duration::from_millis(self.stable_timeout_ms)
    }

    pub fn stable_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stable_poll_interval_ms)
    }
}
