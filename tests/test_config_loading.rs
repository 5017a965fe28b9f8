//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading: defaults, the token
//! override and error reporting.

use std::io::Write;
use tempfile::NamedTempFile;
use thingslink::config::{ConfigError, DeviceConfig};
use thingslink::testing::{ManualClock, MockLink};
use thingslink::Coordinator;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(
        r#"
[device]
app_code = "garden-monitor"
app_version = "1.4.2"
chip_id = 10597059

[session]
endpoint = "mqtt://demo.thingsboard.io:1883"
token = "ACCESS_TOKEN"
local_ip = "10.0.0.7"
retry_interval_ms = 30000
send_interval_ms = 15000

[buffers]
telemetry_capacity = 16
attribute_capacity = 32
telemetry_budget_bytes = 256

[mqtt]
keep_alive_secs = 30
connect_timeout_ms = 2000
"#,
    );

    let config = DeviceConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.device.app_code, "garden-monitor");
    assert_eq!(config.device.chip_id_hex(), "A1B2C3");
    assert_eq!(config.session.endpoint, "mqtt://demo.thingsboard.io:1883");
    assert_eq!(config.session.token, "ACCESS_TOKEN");
    assert_eq!(config.session.retry_interval_ms, 30_000);
    assert_eq!(config.session.send_interval_ms, 15_000);
    assert_eq!(config.buffers.telemetry_capacity, 16);
    assert_eq!(config.buffers.telemetry_budget_bytes, 256);
    assert_eq!(config.mqtt.keep_alive_secs, 30);
    assert_eq!(config.mqtt.connect_timeout_ms, 2000);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let temp_file = write_config(
        r#"
[device]
app_code = "sensor-node"
app_version = "0.1"
"#,
    );

    let config = DeviceConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.device.chip_id_hex(), "000000");
    assert_eq!(config.session.endpoint, "");
    assert_eq!(config.session.token, "");
    assert_eq!(config.session.retry_interval_ms, 60_000);
    assert_eq!(config.session.send_interval_ms, 60_000);
    assert_eq!(config.buffers.telemetry_capacity, 64);
    assert_eq!(config.buffers.attribute_capacity, 1024);
    assert_eq!(config.buffers.telemetry_budget_bytes, 64);
}

#[test]
fn test_token_env_overrides_configured_token() {
    std::env::set_var("THINGSLINK_TEST_TOKEN_SET", "from-env");
    let temp_file = write_config(
        r#"
[device]
app_code = "sensor-node"
app_version = "0.1"

[session]
token = "from-file"
token_env = "THINGSLINK_TEST_TOKEN_SET"
"#,
    );

    let config = DeviceConfig::load_from_file(temp_file.path()).unwrap();
    assert_eq!(config.session.token, "from-env");
}

#[test]
fn test_missing_token_env_keeps_configured_token() {
    std::env::remove_var("THINGSLINK_TEST_TOKEN_UNSET");
    let temp_file = write_config(
        r#"
[device]
app_code = "sensor-node"
app_version = "0.1"

[session]
token = "from-file"
token_env = "THINGSLINK_TEST_TOKEN_UNSET"
"#,
    );

    let config = DeviceConfig::load_from_file(temp_file.path()).unwrap();
    assert_eq!(config.session.token, "from-file");
}

#[test]
fn test_missing_file_is_read_error() {
    let result = DeviceConfig::load_from_file(std::path::Path::new("/nonexistent/thingslink.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let temp_file = write_config("[device\napp_code = ");
    let result = DeviceConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_missing_device_section_is_parse_error() {
    let temp_file = write_config("[session]\nendpoint = \"localhost\"\n");
    let result = DeviceConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_config_round_trips_through_show_output() {
    let temp_file = write_config(
        r#"
[device]
app_code = "sensor-node"
app_version = "0.1"
chip_id = 42
"#,
    );
    let config = DeviceConfig::load_from_file(temp_file.path()).unwrap();

    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed: DeviceConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(reparsed, config);
}

#[tokio::test]
async fn test_loaded_config_drives_coordinator() {
    let temp_file = write_config(
        r#"
[device]
app_code = "sensor-node"
app_version = "0.1"

[session]
endpoint = "broker.local"
token = "tok"
retry_interval_ms = 5000
"#,
    );
    let config = DeviceConfig::load_from_file(temp_file.path()).unwrap();

    let mut coordinator = Coordinator::from_config(&config, MockLink::failing(), ManualClock::new(10));
    coordinator.tick().await;

    assert_eq!(coordinator.config().endpoint, "broker.local");
    assert_eq!(coordinator.config().retry_interval_ms, 5000);
    assert_eq!(coordinator.link().connect_count(), 1);
}
