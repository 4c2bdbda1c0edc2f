//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a TOML file. A missing file is not an
//! error: the service logs a warning and starts with built-in defaults.
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `ONAIR_CONFIG` environment variable
//! 3. User config directory (`~/.config/onair/config.toml`)
//! 4. System config (`/etc/onair/config.toml`, unix only)
//! 5. Built-in defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ONAIR_CONFIG";

/// Upstream rate-limit floor: never poll more often than this
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Opaque station identifier at the remote source
    #[serde(default)]
    pub station_id: Option<String>,

    /// Base URL of the remote station source
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Seconds between polls (clamped to `MIN_POLL_INTERVAL_SECS`)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-request timeout for upstream calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of transitions kept in the trailing log
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Per-client push queue length
    #[serde(default = "default_client_queue_capacity")]
    pub client_queue_capacity: usize,

    /// SQLite database holding registered push devices
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Push-notification collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint receiving `{tokens, title, body, data}` POSTs
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Notification title; defaults to "On air now"
    #[serde(default)]
    pub title: Option<String>,
}

fn default_api_base_url() -> String {
    "https://public.radio.co".to_string()
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    8
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5750
}

fn default_history_size() -> usize {
    50
}

fn default_client_queue_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            station_id: None,
            api_base_url: default_api_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            bind_address: default_bind_address(),
            port: default_port(),
            history_size: default_history_size(),
            client_queue_capacity: default_client_queue_capacity(),
            database_path: None,
            logging: LoggingConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Poll interval with the upstream rate-limit floor applied
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(effective_poll_interval_secs(self.poll_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Station id, or a configuration error when none is set
    pub fn require_station_id(&self) -> Result<&str> {
        match self.station_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(Error::Config(
                "station_id is not set (config file, --station or ONAIR_STATION_ID)".to_string(),
            )),
        }
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("onair.db"))
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.history_size == 0 {
            return Err(Error::Config("history_size must be at least 1".to_string()));
        }
        if self.client_queue_capacity == 0 {
            return Err(Error::Config(
                "client_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.notifications.enabled && self.notifications.endpoint.is_none() {
            return Err(Error::Config(
                "notifications.enabled requires notifications.endpoint".to_string(),
            ));
        }
        Ok(())
    }
}

/// Apply the rate-limit floor, warning when the configured value is too low
pub fn effective_poll_interval_secs(configured: u64) -> u64 {
    if configured < MIN_POLL_INTERVAL_SECS {
        warn!(
            "poll_interval_secs = {} is below the upstream limit, using {}",
            configured, MIN_POLL_INTERVAL_SECS
        );
        MIN_POLL_INTERVAL_SECS
    } else {
        configured
    }
}

/// Locates the config file following the documented priority order
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Path of the config file to read, if any exists
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        if let Some(user) = user_config_path() {
            if user.exists() {
                return Some(user);
            }
        }

        if cfg!(unix) {
            let system = PathBuf::from("/etc/onair/config.toml");
            if system.exists() {
                return Some(system);
            }
        }

        None
    }

    /// Load the resolved config, falling back to defaults when none exists
    ///
    /// A file that was explicitly requested (CLI or env) but is missing or
    /// unreadable is an error; an absent default location is not.
    pub fn load(&self) -> Result<TomlConfig> {
        match self.resolve() {
            Some(path) => {
                let config = load_toml_config(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write a config file atomically (temp file + rename)
///
/// The file may hold the notification API key, so on unix it is created
/// with mode 0600.
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = target.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, target)?;
    Ok(())
}

/// Per-user config file location (`~/.config/onair/config.toml` on Linux)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("onair").join("config.toml"))
}

/// OS-dependent data directory for the device database
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("onair"))
        .unwrap_or_else(|| PathBuf::from("./onair_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5750);
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.api_base_url, "https://public.radio.co");
        assert_eq!(config.logging.level, "info");
        assert!(!config.notifications.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_floor() {
        assert_eq!(effective_poll_interval_secs(1), MIN_POLL_INTERVAL_SECS);
        assert_eq!(effective_poll_interval_secs(10), 10);
        assert_eq!(effective_poll_interval_secs(30), 30);

        let config = TomlConfig {
            poll_interval_secs: 2,
            ..TomlConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_require_station_id() {
        let mut config = TomlConfig::default();
        assert!(matches!(config.require_station_id(), Err(Error::Config(_))));

        config.station_id = Some("   ".into());
        assert!(config.require_station_id().is_err());

        config.station_id = Some("s1a2b3c4d5".into());
        assert_eq!(config.require_station_id().unwrap(), "s1a2b3c4d5");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            station_id = "s1a2b3c4d5"
            port = 6000

            [notifications]
            enabled = true
            endpoint = "https://push.example.com/send"
            "#,
        )
        .unwrap();

        assert_eq!(config.station_id.as_deref(), Some("s1a2b3c4d5"));
        assert_eq!(config.port, 6000);
        assert_eq!(config.history_size, 50);
        assert!(config.notifications.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_notifications_without_endpoint() {
        let config = TomlConfig {
            notifications: NotificationConfig {
                enabled: true,
                ..NotificationConfig::default()
            },
            ..TomlConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
