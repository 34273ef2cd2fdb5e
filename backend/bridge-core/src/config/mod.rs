//! Bridge configuration.
//!
//! Stored as `bridge.json` in the host's config directory. Every field has a
//! default, so a missing file or a partial file is valid.

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::net::{IpAddr, Ipv4Addr};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "bridge.json";
const CONFIG_VERSION: u32 = 1;
const CONFIG_APP_DIR: &str = "toolhive-studio";

pub const BACKEND_URL_ENV: &str = "TOOLHIVE_API_URL";

pub const DEFAULT_BRIDGE_PORT: u16 = 19876;
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: u16 = 8080;
pub const DEFAULT_BACKEND_URL: &str = const_format::concatcp!(
    "http://",
    DEFAULT_BACKEND_HOST,
    ":",
    DEFAULT_BACKEND_PORT
);

// ============================================
// CONFIG STRUCTS
// ============================================

/// Where the bridge server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The workload API the dispatch bridge forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Unprivileged-side connection behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_connect_max_elapsed_ms")]
    pub connect_max_elapsed_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            connect_max_elapsed_ms: default_connect_max_elapsed_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl ProxyConfig {
    pub fn connect_max_elapsed(&self) -> Duration {
        Duration::from_millis(self.connect_max_elapsed_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            proxy: ProxyConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
fn default_port() -> u16 {
    DEFAULT_BRIDGE_PORT
}
fn default_base_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_max_elapsed_ms() -> u64 {
    10_000
}
fn default_call_timeout_ms() -> u64 {
    30_000
}

// ============================================
// IMPLEMENTATION
// ============================================

impl BridgeConfig {
    /// Default config directory: `{dirs::config_dir()}/toolhive-studio`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DirectoryNotFound`] when the platform has no config directory.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_APP_DIR))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Load config from {config_dir}/bridge.json.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: BridgeConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/bridge.json using temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Apply `TOOLHIVE_API_URL` on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            info!("Backend URL overridden by {BACKEND_URL_ENV}: {url}");
            self.backend.base_url = url;
            self.validate()?;
        }
        Ok(self)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if !self.server.host.is_loopback() {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Bridge server must bind a loopback address, got {}",
                    self.server.host
                ),
            });
        }

        let url = &self.backend.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("Invalid backend URL format: {}", url),
            });
        }

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: "backend.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.proxy.call_timeout_ms == 0 || self.proxy.connect_max_elapsed_ms == 0 {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: "proxy timeouts must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Load `.env` from the working directory or any parent, if present.
///
/// Returns the path that was loaded. A missing file is not an error.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            info!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            warn!("Failed to load .env: {e}");
            None
        }
    }
}
