//! # Tote Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TOTE_API_URL=https://staging.example.test                          │
//! │     TOTE_STALE_RESPONSES=last_resolved_wins                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tote/tote.toml (Linux)                                   │
//! │     ~/Library/Application Support/app.tote.tote/tote.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     https://fakestoreapi.com, 10 s timeout, prefix "persist"           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tote.toml
//! [api]
//! base_url = "https://fakestoreapi.com"
//! timeout_secs = 10
//!
//! [storage]
//! database_path = "/data/tote.db"   # optional, platform data dir otherwise
//! key_prefix = "persist"
//! in_memory = false
//!
//! [store]
//! # latest_dispatched_wins (default) drops responses of superseded
//! # requests. last_resolved_wins applies every response as it arrives,
//! # which lets a slow stale response overwrite a newer one.
//! stale_responses = "latest_dispatched_wins"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use tote_api::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use tote_core::StaleResponsePolicy;
use tote_db::DbConfig;

use crate::error::{StoreError, StoreResult};

/// Longest accepted request timeout.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Default namespace of persisted keys.
pub const DEFAULT_KEY_PREFIX: &str = "persist";

// =============================================================================
// Sections
// =============================================================================

/// `[api]` - remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[storage]` - device persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. `None` means `tote.db` in the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Keep snapshots in memory only (nothing survives a restart).
    #[serde(default)]
    pub in_memory: bool,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: None,
            key_prefix: default_key_prefix(),
            in_memory: false,
        }
    }
}

/// `[store]` - store behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub stale_responses: StaleResponsePolicy,
}

// =============================================================================
// ToteConfig
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToteConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl ToteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tote.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| StoreError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        ApiConfig::new(&self.api.base_url)?;

        if self.api.timeout_secs == 0 || self.api.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(StoreError::InvalidConfig(format!(
                "timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
                self.api.timeout_secs
            )));
        }

        if self.storage.key_prefix.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "key_prefix must not be empty".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any variable source (the process environment
    /// in production, a map in tests).
    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TOTE_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(timeout) = var("TOTE_API_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric TOTE_API_TIMEOUT_SECS"),
            }
        }

        if let Some(path) = var("TOTE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(prefix) = var("TOTE_PERSIST_PREFIX") {
            self.storage.key_prefix = prefix;
        }

        if let Some(policy) = var("TOTE_STALE_RESPONSES") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding stale response policy from environment");
                    self.store.stale_responses = parsed;
                }
                Err(e) => warn!(error = %e, "Unknown stale response policy in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("app", "tote", "tote")
            .map(|dirs| dirs.config_dir().join("tote.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// HTTP client configuration.
    pub fn api_config(&self) -> StoreResult<ApiConfig> {
        Ok(ApiConfig::new(&self.api.base_url)?.with_timeout(self.request_timeout()))
    }

    /// SQLite configuration, `None` when storage is in-memory or no data
    /// dir can be determined.
    pub fn db_config(&self) -> Option<DbConfig> {
        if self.storage.in_memory {
            return None;
        }
        self.storage
            .database_path
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("app", "tote", "tote")
                    .map(|dirs| dirs.data_dir().join("tote.db"))
            })
            .map(DbConfig::new)
    }
}
