//! Application configuration with layered loading.
//!
//! Sources, highest precedence first:
//!
//! 1. Environment variables (`OFFSYNC_*`)
//! 2. TOML config file (if `OFFSYNC_CONFIG_FILE` is set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL that relative paths resolve against.
    ///
    /// Set via OFFSYNC_ORIGIN.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite database holding the outbox and caches.
    ///
    /// Set via OFFSYNC_DB_PATH.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every cache generation name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Current cache generation tag. Changing it rolls every role over to a
    /// fresh generation on the next install/activate.
    ///
    /// Set via OFFSYNC_CACHE_VERSION.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths fetched into the static cache at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Page served when a read misses both network and cache.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Resource refreshed on every scheduled sync.
    #[serde(default = "default_periodic_resource")]
    pub periodic_resource: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Failed deliveries after which an outbox entry is parked.
    ///
    /// Unset means retry forever.
    #[serde(default)]
    pub replay_max_attempts: Option<u32>,

    /// How often a pending sync registration checks connectivity.
    #[serde(default = "default_sync_check_interval_ms")]
    pub sync_check_interval_ms: u64,

    /// Scheduled sync cadence.
    #[serde(default = "default_periodic_interval_ms")]
    pub periodic_interval_ms: u64,

    /// Title used for push payloads that carry none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Icon attached to push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offsync.sqlite")
}

fn default_cache_prefix() -> String {
    "offsync".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_precache() -> Vec<String> {
    ["/", "/index.html", "/offline.html", "/manifest.json", "/icons/icon-192.png", "/icons/icon-512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_periodic_resource() -> String {
    "/api/data".into()
}

fn default_user_agent() -> String {
    "offsync/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_sync_check_interval_ms() -> u64 {
    15_000
}

fn default_periodic_interval_ms() -> u64 {
    3_600_000
}

fn default_notification_title() -> String {
    "offsync".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            periodic_resource: default_periodic_resource(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            replay_max_attempts: None,
            sync_check_interval_ms: default_sync_check_interval_ms(),
            periodic_interval_ms: default_periodic_interval_ms(),
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sync_check_interval(&self) -> Duration {
        Duration::from_millis(self.sync_check_interval_ms)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed, or
    /// if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFSYNC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
