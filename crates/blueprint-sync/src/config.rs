//! Configuration for the synchronization session
//!
//! Values come from environment variables layered over built-in defaults.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use blueprint_types::{BundleSource, DirBundleSource, HttpBundleSource};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{SessionError, SessionResult};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// WebSocket endpoint of the external process
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Fixed delay between a lost connection and the next attempt, in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Where type bundles live: an `http(s)://` base URL or a directory
    #[serde(default = "default_typeinfo_base")]
    pub typeinfo_base: String,

    /// Bundles that must be loaded before connecting
    #[serde(default = "default_preload_bundles")]
    pub preload_bundles: Vec<String>,

    /// Timeout for a single HTTP bundle fetch, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Log filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON logs instead of pretty ones
    #[serde(default)]
    pub json_logs: bool,
}

fn default_server_url() -> String {
    "ws://localhost:5566/".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_typeinfo_base() -> String {
    ".".to_string()
}

fn default_preload_bundles() -> Vec<String> {
    [
        "flame_foundation",
        "flame_network",
        "flame_graphics",
        "flame_sound",
        "flame_universe",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info,blueprint=debug".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            typeinfo_base: default_typeinfo_base(),
            preload_bundles: default_preload_bundles(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            log_filter: default_log_filter(),
            json_logs: false,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn load() -> SessionResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> SessionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("BLUEPRINT_SERVER_URL") {
            config.server_url = url;
        }

        if let Some(delay) = lookup("BLUEPRINT_RECONNECT_DELAY_MS") {
            if let Ok(delay) = delay.parse::<u64>() {
                config.reconnect_delay_ms = delay;
            } else {
                warn!("Invalid BLUEPRINT_RECONNECT_DELAY_MS value: {}", delay);
            }
        }

        if let Some(base) = lookup("BLUEPRINT_TYPEINFO_BASE") {
            config.typeinfo_base = base;
        }

        if let Some(bundles) = lookup("BLUEPRINT_PRELOAD_BUNDLES") {
            config.preload_bundles = bundles
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(timeout) = lookup("BLUEPRINT_FETCH_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                config.fetch_timeout_secs = timeout;
            } else {
                warn!("Invalid BLUEPRINT_FETCH_TIMEOUT_SECS value: {}", timeout);
            }
        }

        if let Some(filter) = lookup("LOG_FILTER") {
            config.log_filter = filter;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "json" => config.json_logs = true,
                "pretty" => config.json_logs = false,
                other => warn!("Invalid LOG_FORMAT value: {}", other),
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SessionResult<()> {
        if self.server_url.trim().is_empty() {
            return Err(SessionError::Config("server URL must not be empty".to_string()));
        }
        Ok(())
    }

    /// Reconnect delay as a duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Build the bundle source selected by `typeinfo_base`
    pub fn bundle_source(&self) -> SessionResult<Arc<dyn BundleSource>> {
        let base = self.typeinfo_base.as_str();
        if base.starts_with("http://") || base.starts_with("https://") {
            info!(base_url = %base, "Fetching type bundles over HTTP");
            let source = HttpBundleSource::new(base, Duration::from_secs(self.fetch_timeout_secs))?;
            Ok(Arc::new(source))
        } else {
            info!(directory = %base, "Reading type bundles from disk");
            Ok(Arc::new(DirBundleSource::new(base)))
        }
    }
}
