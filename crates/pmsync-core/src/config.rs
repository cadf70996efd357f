//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/pmsync/config.toml)
//! 3. Environment variables (PMSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! `Config` is the editable, on-disk form. The reconciler only ever sees the
//! validated, immutable `PmsConfig` produced by [`Config::pms_config`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::sync::{RetryPolicy, UnsupportedEventPolicy};

/// Environment variable prefix
const ENV_PREFIX: &str = "PMSYNC";

/// Identifies the PMS vendor integration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PmsProvider {
    pub name: String,
    pub id: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for PmsProvider {
    fn default() -> Self {
        Self {
            name: "Generic PMS".to_string(),
            id: "generic".to_string(),
            api_version: default_api_version(),
        }
    }
}

/// Immutable connection settings handed to the reconciler at construction
#[derive(Clone, PartialEq, Eq)]
pub struct PmsConfig {
    pub provider: PmsProvider,
    pub api_key: String,
    pub api_endpoint: String,
    pub hotel_id: String,
    /// Delay between incremental syncs
    pub sync_interval: Duration,
    /// Per-request timeout used by the HTTP adapter
    pub request_timeout: Duration,
}

impl fmt::Debug for PmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PmsConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("api_endpoint", &self.api_endpoint)
            .field("hotel_id", &self.hotel_id)
            .field("sync_interval", &self.sync_interval)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (SQLite db)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub provider: PmsProvider,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_endpoint: Option<String>,

    #[serde(default)]
    pub hotel_id: Option<String>,

    /// Seconds between incremental syncs
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts for an incremental pass that failed on a transient
    /// fetch error (0 waits for the next tick)
    #[serde(default)]
    pub incremental_retries: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    /// What to do with room/rate/availability events nobody handles
    #[serde(default)]
    pub unsupported_events: UnsupportedEventPolicy,

    /// Log file path (default: stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            provider: PmsProvider::default(),
            api_key: None,
            api_endpoint: None,
            hotel_id: None,
            sync_interval_secs: default_sync_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            incremental_retries: 0,
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            unsupported_events: UnsupportedEventPolicy::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the CLI
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_API_KEY", ENV_PREFIX)) {
            self.api_key = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_API_ENDPOINT", ENV_PREFIX)) {
            self.api_endpoint = non_empty(val);
        }

        if let Ok(val) = std::env::var(format!("{}_HOTEL_ID", ENV_PREFIX)) {
            self.hotel_id = non_empty(val);
        }

        // Unparseable values are ignored rather than clobbering the file value
        if let Ok(val) = std::env::var(format!("{}_SYNC_INTERVAL_SECS", ENV_PREFIX)) {
            if let Ok(secs) = val.trim().parse() {
                self.sync_interval_secs = secs;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = non_empty(val).map(PathBuf::from);
        }
    }

    /// Validate and build the immutable reconciler configuration
    pub fn pms_config(&self) -> Result<PmsConfig> {
        let Some(api_key) = self.api_key.clone() else {
            bail!("api_key is not configured. Set it with:\n  pmsync config set api_key <key>");
        };
        let Some(api_endpoint) = self.api_endpoint.clone() else {
            bail!(
                "api_endpoint is not configured. Set it with:\n  \
                 pmsync config set api_endpoint https://pms.example.com/api"
            );
        };
        let Some(hotel_id) = self.hotel_id.clone() else {
            bail!("hotel_id is not configured. Set it with:\n  pmsync config set hotel_id <id>");
        };
        if self.sync_interval_secs == 0 {
            bail!("sync_interval_secs must be greater than zero");
        }

        Ok(PmsConfig {
            provider: self.provider.clone(),
            api_key,
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            hotel_id,
            sync_interval: Duration::from_secs(self.sync_interval_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }

    /// Retry behaviour for failed incremental passes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.incremental_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PMSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pmsync")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("pmsync.db")
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pmsync")
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_initial_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}
