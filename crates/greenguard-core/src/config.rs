//! Client configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults (local backend on port 8020)
//! 2. An optional TOML file
//! 3. Environment variables `GREENGUARD_API_URL` and `GREENGUARD_MAPS_API_KEY`
//!
//! ```toml
//! api_base_url = "https://api.greenguard.example"
//! map_api_key = "AIza..."
//! request_timeout = 10
//!
//! [realtime]
//! reconnect_delay = 5
//! event_capacity = 100
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectPolicy;

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8020";

/// Placeholder map key shipped in sample configs. Treated as "no key".
pub const MAP_API_KEY_PLACEHOLDER: &str = "YOUR_GOOGLE_MAPS_API_KEY";

/// Environment variable overriding [`ClientConfig::api_base_url`].
pub const ENV_API_URL: &str = "GREENGUARD_API_URL";

/// Environment variable overriding [`ClientConfig::map_api_key`].
pub const ENV_MAPS_API_KEY: &str = "GREENGUARD_MAPS_API_KEY";

/// Default REST request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between a stream closing and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default broadcast capacity for channel events.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Whole-second durations in TOML.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, `http://` or `https://`.
    pub api_base_url: String,
    /// Maps API key. The placeholder value disables map features.
    pub map_api_key: String,
    /// Timeout for REST requests, in seconds in TOML.
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    /// Real-time channel settings.
    pub realtime: ChannelOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            map_api_key: MAP_API_KEY_PLACEHOLDER.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            realtime: ChannelOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Load a TOML file, apply environment overrides, then validate.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Apply `GREENGUARD_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(key) = get(ENV_MAPS_API_KEY) {
            self.map_api_key = key;
        }
    }

    /// Whether a real maps API key is configured.
    pub fn maps_enabled(&self) -> bool {
        let key = self.map_api_key.trim();
        !key.is_empty() && key != MAP_API_KEY_PLACEHOLDER
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - the base URL is non-empty and uses `http` or `https`
    /// - the request timeout is non-zero
    /// - the channel options are valid
    ///
    /// ```
    /// use greenguard_core::config::ClientConfig;
    ///
    /// ClientConfig::default().validate().expect("defaults are valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let url = self.api_base_url.trim();
        if url.is_empty() {
            errors.push(ValidationError::new(
                "api_base_url",
                "base URL cannot be empty",
            ));
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "api_base_url",
                format!("base URL '{}' must start with http:// or https://", url),
            ));
        }

        if self.request_timeout.is_zero() {
            errors.push(ValidationError::new(
                "request_timeout",
                "request timeout must be greater than 0",
            ));
        }

        errors.extend(self.realtime.validate("realtime"));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Real-time channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelOptions {
    /// Fixed wait between a closed stream and the next attempt.
    #[serde(with = "secs")]
    pub reconnect_delay: Duration,
    /// Broadcast buffer size for [`crate::ChannelEvent`]s.
    pub event_capacity: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ChannelOptions {
    /// Set the reconnect delay.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the event buffer size.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// The reconnect policy these options describe.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(self.reconnect_delay)
    }

    /// Validate channel options, prefixing field names with `prefix`.
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.reconnect_delay.is_zero() {
            errors.push(ValidationError::new(
                format!("{}.reconnect_delay", prefix),
                "reconnect delay must be greater than 0",
            ));
        }
        if self.event_capacity == 0 {
            errors.push(ValidationError::new(
                format!("{}.event_capacity", prefix),
                "event capacity must be greater than 0",
            ));
        }
        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `realtime.reconnect_delay`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
