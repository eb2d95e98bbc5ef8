//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homied.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use homie_adapter_mqtt::MqttConfig;
use homie_adapter_virtual::ComponentConfig;
use homie_domain::id::DeviceId;
use homie_domain::message::{Message, QoS};
use homie_domain::settings::{DEFAULT_PREFIX, HomieSettings};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity and convention settings.
    pub homie: HomieConfig,
    /// Broker connection.
    pub mqtt: MqttConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Virtual components; empty means the demo set.
    pub components: Vec<ComponentConfig>,
}

/// `[homie]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HomieConfig {
    /// Topic root.
    pub prefix: String,
    /// Explicit device id; derived from `name` when absent.
    pub device_id: Option<String>,
    /// Human device name, published as `$name`.
    pub name: String,
    pub qos: QoS,
    pub retained: bool,
    /// Subscribe to `$broadcast` messages.
    pub broadcast: bool,
    /// Seconds between two `$stats` publications.
    pub stats_interval_secs: u64,
    /// Forward log events at or above this level to `$log`.
    pub log_forward_level: Option<String>,
    pub firmware_name: String,
    pub firmware_version: String,
    /// Extra device attributes, e.g. `"$mac" = "…"`.
    pub attributes: Vec<(String, String)>,
    /// Published on every connect, before the announce.
    pub birth: Option<RawMessage>,
    /// Published on graceful shutdown, after `$state=disconnected`.
    pub shutdown: Option<RawMessage>,
}

/// A free-form message outside the device topic tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMessage {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub qos: QoS,
    #[serde(default)]
    pub retain: bool,
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        Message {
            topic: raw.topic,
            payload: raw.payload,
            qos: raw.qos,
            retain: raw.retain,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `homied.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("homied.toml")?;
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
        if let Ok(val) = std::env::var("HOMIED_BROKER_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("HOMIED_BROKER_PORT")
            && let Ok(port) = val.parse()
        {
            self.mqtt.broker_port = port;
        }
        if let Ok(val) = std::env::var("HOMIED_PREFIX") {
            self.homie.prefix = val;
        }
        if let Ok(val) = std::env::var("HOMIED_DEVICE_ID") {
            self.homie.device_id = Some(val);
        }
        if let Ok(val) = std::env::var("HOMIED_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.homie.prefix;
        if prefix.is_empty()
            || prefix.ends_with('/')
            || prefix.contains(['+', '#'])
        {
            return Err(ConfigError::Validation(format!(
                "invalid topic prefix {prefix:?}"
            )));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation("broker port must be non-zero".to_string()));
        }
        if self.mqtt.request_capacity == 0 {
            return Err(ConfigError::Validation(
                "request capacity must be non-zero".to_string(),
            ));
        }
        if self.homie.stats_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "stats interval must be non-zero".to_string(),
            ));
        }
        self.log_forward_level()?;
        self.device_id()?;
        Ok(())
    }

    /// The configured device id, or one derived from the device name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when neither yields a valid id.
    pub fn device_id(&self) -> Result<DeviceId, ConfigError> {
        let id = match &self.homie.device_id {
            Some(id) => DeviceId::new(id.as_str()),
            None => DeviceId::from_name(&self.homie.name),
        };
        id.map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// Level for `$log` forwarding, `None` when disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for an unknown level name.
    pub fn log_forward_level(&self) -> Result<Option<tracing::Level>, ConfigError> {
        self.homie
            .log_forward_level
            .as_deref()
            .map(|level| {
                tracing::Level::from_str(level).map_err(|_| {
                    ConfigError::Validation(format!("unknown log level {level:?}"))
                })
            })
            .transpose()
    }

    #[must_use]
    pub fn settings(&self) -> HomieSettings {
        HomieSettings {
            prefix: self.homie.prefix.clone(),
            qos: self.homie.qos,
            retained: self.homie.retained,
            broadcast: self.homie.broadcast,
        }
    }

    #[must_use]
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.homie.stats_interval_secs)
    }
}

impl Default for HomieConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            device_id: None,
            name: "homied".to_string(),
            qos: QoS::AtLeastOnce,
            retained: true,
            broadcast: false,
            stats_interval_secs: 60,
            log_forward_level: None,
            firmware_name: env!("CARGO_PKG_NAME").to_string(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            attributes: Vec::new(),
            birth: None,
            shutdown: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homied=info,homie=info,rumqttc=warn".to_string(),
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
