//! Device configuration loaded from TOML
//!
//! Values are taken as written. Endpoint and token in particular are not
//! checked here; a bad value simply makes the connect attempt fail and the
//! retry gate takes over.

use crate::buffer::{DEFAULT_ATTRIBUTE_CAPACITY, DEFAULT_TELEMETRY_BUDGET, DEFAULT_TELEMETRY_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Complete device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    pub device: DeviceIdentity,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub buffers: BufferLimits,
    #[serde(default)]
    pub mqtt: MqttSection,
}

/// Identity pushed as attributes on every successful connect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceIdentity {
    /// Application code
    pub app_code: String,
    /// Application version
    pub app_version: String,
    /// Hardware chip id, reported as six upper-case hex digits
    #[serde(default)]
    pub chip_id: u32,
}

impl DeviceIdentity {
    pub fn new<S: Into<String>>(app_code: S, app_version: S, chip_id: u32) -> Self {
        Self {
            app_code: app_code.into(),
            app_version: app_version.into(),
            chip_id,
        }
    }

    /// Chip id as reported to the endpoint (`%06X`)
    pub fn chip_id_hex(&self) -> String {
        format!("{:06X}", self.chip_id)
    }

    /// MQTT client identifier derived from app code and chip id
    pub fn client_id(&self) -> String {
        format!("{}-{}", self.app_code.trim(), self.chip_id_hex())
    }
}

/// Endpoint session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Endpoint address: `host`, `host:port` or `mqtt://host:port`
    #[serde(default)]
    pub endpoint: String,
    /// Device access token
    #[serde(default)]
    pub token: String,
    /// Environment variable that overrides `token` when set
    pub token_env: Option<String>,
    /// Local network address reported as `device_local_ip`
    #[serde(default)]
    pub local_ip: String,
    /// Minimum time between connect attempts
    #[serde(default = "default_interval_ms")]
    pub retry_interval_ms: u32,
    /// Minimum time between flushes
    #[serde(default = "default_interval_ms")]
    pub send_interval_ms: u32,
}

fn default_interval_ms() -> u32 {
    60_000 // 1 minute
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: String::new(),
            token_env: None,
            local_ip: String::new(),
            retry_interval_ms: default_interval_ms(),
            send_interval_ms: default_interval_ms(),
        }
    }
}

/// Buffer capacities and telemetry byte budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BufferLimits {
    #[serde(default = "default_telemetry_capacity")]
    pub telemetry_capacity: usize,
    #[serde(default = "default_attribute_capacity")]
    pub attribute_capacity: usize,
    #[serde(default = "default_telemetry_budget")]
    pub telemetry_budget_bytes: usize,
}

fn default_telemetry_capacity() -> usize {
    DEFAULT_TELEMETRY_CAPACITY
}

fn default_attribute_capacity() -> usize {
    DEFAULT_ATTRIBUTE_CAPACITY
}

fn default_telemetry_budget() -> usize {
    DEFAULT_TELEMETRY_BUDGET
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            telemetry_capacity: DEFAULT_TELEMETRY_CAPACITY,
            attribute_capacity: DEFAULT_ATTRIBUTE_CAPACITY,
            telemetry_budget_bytes: DEFAULT_TELEMETRY_BUDGET,
        }
    }
}

/// MQTT client tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Keep alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Upper bound for one connect attempt
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Time one pump may spend driving the event loop
    #[serde(default = "default_pump_budget")]
    pub pump_budget_ms: u64,
    /// Request channel capacity between client and event loop
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Time one send may spend writing queued requests out when the channel is full
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

fn default_keep_alive() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_pump_budget() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    10
}

fn default_send_timeout() -> u64 {
    1_000
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive(),
            connect_timeout_ms: default_connect_timeout(),
            pump_budget_ms: default_pump_budget(),
            channel_capacity: default_channel_capacity(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl DeviceConfig {
    /// Load configuration from a TOML file and resolve the token variable
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: DeviceConfig = toml::from_str(&content)?;
        config.resolve_env_vars();
        Ok(config)
    }

    /// Replace the token with the value of `token_env`, when that variable is set
    fn resolve_env_vars(&mut self) {
        if let Some(name) = &self.session.token_env {
            match std::env::var(name) {
                Ok(token) => self.session.token = token,
                Err(_) => warn!(
                    variable = %name,
                    "Token environment variable not set, keeping configured token"
                ),
            }
        }
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[device]
app_code = "garden-monitor"
app_version = "1.0.0"
chip_id = 0xA1B2C3

[session]
endpoint = "mqtt://localhost:1883"
token = "test-token"
local_ip = "192.168.1.40"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
