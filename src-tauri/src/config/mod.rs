use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::info;

use crate::types::error::SparkError;

/// Global configuration instance
static CONFIG: OnceCell<RwLock<AppConfig>> = OnceCell::new();

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Platform API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Background refresh settings
    #[serde(default)]
    pub sync: SyncSettings,

    /// Local in-app notifications (the inbox badge works without them)
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Override for the cache directory (defaults to the platform data dir)
    pub cache_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            sync: SyncSettings::default(),
            notifications: NotificationSettings::default(),
            cache_dir: None,
        }
    }
}

/// Platform API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Background refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Seconds between background refreshes of each applicable channel
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum attempts for a queued offline action before it is dropped
    #[serde(default = "default_max_retries")]
    pub max_action_retries: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_action_retries: default_max_retries(),
        }
    }
}

/// Local notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// When false, the notification store is not created at all and the
    /// inbox runs without it.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.sparkmate.uk".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_poll_interval_secs() -> u64 {
    45
}

fn default_max_retries() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// Path to the config file: `<config dir>/sparkmate/config.toml`
pub fn config_file_path() -> Result<PathBuf, SparkError> {
    let dir = dirs::config_dir()
        .ok_or_else(|| SparkError::Config("Could not determine config directory".to_string()))?
        .join("sparkmate");
    Ok(dir.join("config.toml"))
}

/// Load configuration from disk, falling back to defaults when the file is
/// missing. Safe to call more than once; later calls are no-ops.
pub fn init_config() -> Result<(), SparkError> {
    if CONFIG.get().is_some() {
        return Ok(());
    }

    let path = config_file_path()?;
    let config = if path.exists() {
        let raw = fs::read_to_string(&path)?;
        let parsed: AppConfig = toml::from_str(&raw)?;
        info!("Loaded config from {:?}", path);
        parsed
    } else {
        info!("No config file at {:?}, using defaults", path);
        AppConfig::default()
    };

    let _ = CONFIG.set(RwLock::new(config));
    Ok(())
}

/// Get a clone of the current configuration, initialising defaults first if
/// needed.
pub fn get_config() -> AppConfig {
    if CONFIG.get().is_none() {
        let _ = init_config();
    }
    CONFIG
        .get()
        .and_then(|lock| lock.read().ok().map(|c| c.clone()))
        .unwrap_or_default()
}

/// Persist the given configuration and replace the in-memory copy.
pub fn save_config(config: &AppConfig) -> Result<(), SparkError> {
    let path = config_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let raw = toml::to_string_pretty(config)
        .map_err(|e| SparkError::Config(format!("Failed to serialize config: {}", e)))?;
    fs::write(&path, raw)?;

    if let Some(lock) = CONFIG.get() {
        if let Ok(mut current) = lock.write() {
            *current = config.clone();
        }
    } else {
        let _ = CONFIG.set(RwLock::new(config.clone()));
    }

    info!("Saved config to {:?}", path);
    Ok(())
}

/// Directory for per-user cache databases.
pub fn cache_dir() -> Result<PathBuf, SparkError> {
    if let Some(dir) = get_config().cache_dir {
        return Ok(dir);
    }

    // On desktop, use ../.sqlite in debug mode for easier debugging
    if cfg!(debug_assertions) {
        return Ok(PathBuf::from("../.sqlite"));
    }

    Ok(dirs::data_local_dir()
        .ok_or_else(|| SparkError::Config("Could not determine data directory".to_string()))?
        .join("sparkmate")
        .join("cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, default_base_url());
        assert_eq!(config.sync.poll_interval_secs, default_poll_interval_secs());
        assert!(config.notifications.enabled);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://staging.sparkmate.uk"

            [notifications]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://staging.sparkmate.uk");
        assert_eq!(config.api.timeout_secs, default_timeout_secs());
        assert!(!config.notifications.enabled);
    }
}
