use crate::error::config::ConfigError;
use crate::session::ReplayPolicy;

use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;
const MAX_TIMEOUT_SECS: u64 = 300;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingConfig {
    /// Name presented to the sensor during pairing and used as the CSR common name prefix.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
    /// Talk to the pairing endpoints over TLS (unpinned until the CA is known).
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            use_tls: default_use_tls(),
        }
    }
}

impl PairingConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,
    #[serde(default = "default_reconnect_max_elapsed_secs")]
    pub reconnect_max_elapsed_secs: u64,
    #[serde(default)]
    pub replay_policy: ReplayPolicy,
    /// Overrides the event stream URL derived from the sensor address.
    #[serde(default)]
    pub events_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            auto_reconnect: default_auto_reconnect(),
            reconnect_max_elapsed_secs: default_reconnect_max_elapsed_secs(),
            replay_policy: ReplayPolicy::default(),
            events_url: None,
        }
    }
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_max_elapsed(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_elapsed_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub pairing: PairingConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            pairing: PairingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_client_name() -> String {
    "sensor-companion".to_string()
}
fn default_resolve_timeout_secs() -> u64 {
    5
}
fn default_use_tls() -> bool {
    true
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_auto_reconnect() -> bool {
    true
}
fn default_reconnect_max_elapsed_secs() -> u64 {
    120
}

// ============================================
// IMPLEMENTATION
// ============================================

impl AppConfig {
    /// Load config from {config_dir}/config.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(AppConfig)` if loaded successfully or defaults if file missing.
    /// Returns `Err(ConfigError)` if file exists but is corrupted/invalid.
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
            warn!("Failed to read config file: {e}");
            ConfigError::read(&config_path, e)
        })?;

        let config: AppConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::parse(&config_path, e.to_string())
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/config.json using atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// the temp file write, or the final rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::write(config_dir, e))?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::serialize(e.to_string()))?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::write(&temp_path, e))?;

        // Atomic rename (POSIX guarantees atomicity)
        std::fs::rename(&temp_path, &config_path)
            .map_err(|e| ConfigError::write(&config_path, e))?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        if self.pairing.client_name.trim().is_empty() {
            return Err(ConfigError::validation("client_name cannot be empty"));
        }

        validate_timeout("resolve_timeout_secs", self.pairing.resolve_timeout_secs)?;
        validate_timeout("request_timeout_secs", self.session.request_timeout_secs)?;

        if self.session.reconnect_max_elapsed_secs == 0 {
            return Err(ConfigError::validation(
                "reconnect_max_elapsed_secs must be greater than 0",
            ));
        }

        if let Some(ref events_url) = self.session.events_url {
            let parsed = Url::parse(events_url).map_err(|e| {
                ConfigError::validation(format!("Invalid events_url '{events_url}': {e}"))
            })?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(ConfigError::validation(format!(
                    "Invalid events_url scheme: {} (expected ws or wss)",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }
}

fn validate_timeout(name: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::validation(format!(
            "Invalid {name}: {secs} (must be 1-{MAX_TIMEOUT_SECS})"
        )));
    }
    Ok(())
}
