//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `plughub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::Deserialize;

use plughub_adapter_device_http::HttpClientConfig;
use plughub_app::services::StateServiceConfig;
use plughub_app::tracker::TrackerConfig;
use plughub_domain::device::{DeviceEntry, DeviceType};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discovery pipeline settings.
    pub discovery: DiscoveryConfig,
    /// Cached state service settings.
    pub service: ServiceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Statically configured devices (with a `host`: discovered statically;
    /// without: display-name lookup only).
    pub devices: Vec<DeviceEntry>,
}

/// Discovery pipeline configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Enable the UDP broadcast listener.
    pub udp_enabled: bool,
    /// Address the UDP listener binds to (`0.0.0.0` = all interfaces).
    pub listen: IpAddr,
    /// Seconds without a sighting before a device is marked unreachable.
    pub reachable_timeout_secs: u64,
    /// Device types admitted by the sighting filter. Empty = all known types.
    pub device_types: Vec<DeviceType>,
}

/// Cached state service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// How long a fetched device state stays fresh, in milliseconds.
    pub cache_ttl_ms: u64,
    /// Poll sweep period in seconds.
    pub poll_interval_secs: u64,
    /// How recently a device must have been read to stay in the poll sweep,
    /// in seconds.
    pub active_duration_secs: u64,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `plughub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// semantic check fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("plughub.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PLUGHUB_LISTEN") {
            if let Ok(listen) = val.parse() {
                self.discovery.listen = listen;
            }
        }
        if let Ok(val) = std::env::var("PLUGHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.reachable_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "reachable_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.service.cache_ttl_ms == 0 {
            return Err(ConfigError::Validation(
                "cache_ttl_ms must be non-zero".to_string(),
            ));
        }
        if self.service.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_secs must be non-zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.devices {
            if !seen.insert(&entry.id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device id {}",
                    entry.id
                )));
            }
        }
        Ok(())
    }

    /// Tracker configuration derived from the discovery section.
    #[must_use]
    pub fn tracker_config(&self) -> TrackerConfig {
        let device_type_filter: HashSet<DeviceType> = if self.discovery.device_types.is_empty() {
            DeviceType::ALL.into_iter().collect()
        } else {
            self.discovery.device_types.iter().copied().collect()
        };
        TrackerConfig {
            reachable_timeout: Duration::from_secs(self.discovery.reachable_timeout_secs),
            device_type_filter,
        }
    }

    /// State service configuration derived from the service section.
    #[must_use]
    pub fn state_service_config(&self) -> StateServiceConfig {
        StateServiceConfig {
            cache_ttl: Duration::from_millis(self.service.cache_ttl_ms),
            poll_interval: Duration::from_secs(self.service.poll_interval_secs),
            active_duration: Duration::from_secs(self.service.active_duration_secs),
        }
    }

    /// HTTP transport configuration for the device clients.
    #[must_use]
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: Duration::from_secs(self.service.request_timeout_secs),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            udp_enabled: true,
            listen: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            reachable_timeout_secs: 30,
            device_types: Vec::new(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 2000,
            poll_interval_secs: 4,
            active_duration_secs: 60,
            request_timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "plughubd=info,plughub_app=info,plughub_adapter_discovery_udp=info"
                .to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
