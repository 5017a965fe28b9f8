//! Pure connection configuration for the MQTT link
//!
//! Endpoint parsing, option building and topic names. Nothing here touches
//! the network.

use crate::config::MqttSection;
use crate::transport::LinkError;
use rumqttc::MqttOptions;
use std::time::Duration;
use url::Url;

/// Plain MQTT port used when the endpoint does not name one
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Client id used when the configured one is blank
const FALLBACK_CLIENT_ID: &str = "thingslink";

/// Connection state of the MQTT link
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// No connect attempt has been made yet
    Idle,
    /// Connect issued, waiting for the acknowledgement
    Connecting,
    /// Acknowledged by the broker and ready to publish
    Connected,
    /// Disconnected with reason
    Disconnected(String),
}

/// Broker address resolved from an endpoint string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// Parse `host`, `host:port` or `mqtt://host[:port]` (pure function)
pub fn parse_endpoint(endpoint: &str) -> Result<Endpoint, LinkError> {
    let invalid = || LinkError::InvalidEndpoint(endpoint.to_string());

    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("mqtt://{endpoint}")
    };

    let url = Url::parse(&candidate).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "mqtt" | "tcp") {
        return Err(invalid());
    }

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(invalid)?;
    let port = url.port().unwrap_or(DEFAULT_MQTT_PORT);

    Ok(Endpoint {
        host: host.to_string(),
        port,
    })
}

/// Build MQTT options for one connect attempt (pure function)
///
/// The access token is the MQTT username with an empty password, which is
/// how device credentials are presented to a ThingsBoard-style broker.
pub fn configure_mqtt_options(
    client_id: &str,
    endpoint: &Endpoint,
    token: &str,
    config: &MqttSection,
) -> MqttOptions {
    let client_id = normalize_client_id(client_id);
    let mut mqtt_options = MqttOptions::new(client_id, endpoint.host.clone(), endpoint.port);

    mqtt_options.set_credentials(token, "");
    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    mqtt_options.set_clean_session(true);

    mqtt_options
}

/// Client ids may not be empty or start with whitespace
fn normalize_client_id(client_id: &str) -> String {
    let trimmed = client_id.trim();
    if trimmed.is_empty() {
        FALLBACK_CLIENT_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Device API topic names
pub struct TopicBuilder;

impl TopicBuilder {
    /// Telemetry upload topic
    pub fn telemetry_topic() -> &'static str {
        "v1/devices/me/telemetry"
    }

    /// Client-side attribute upload topic
    pub fn attributes_topic() -> &'static str {
        "v1/devices/me/attributes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host() {
        assert_eq!(
            parse_endpoint("demo.thingsboard.io").unwrap(),
            Endpoint {
                host: "demo.thingsboard.io".to_string(),
                port: 1883
            }
        );
    }

    #[test]
    fn test_parse_host_and_port() {
        let endpoint = parse_endpoint("192.168.1.10:11883").unwrap();
        assert_eq!(endpoint.host, "192.168.1.10");
        assert_eq!(endpoint.port, 11883);
    }

    #[test]
    fn test_parse_url() {
        let endpoint = parse_endpoint("mqtt://broker.local:1884").unwrap();
        assert_eq!(endpoint.host, "broker.local");
        assert_eq!(endpoint.port, 1884);

        let endpoint = parse_endpoint("tcp://broker.local").unwrap();
        assert_eq!(endpoint.port, DEFAULT_MQTT_PORT);
    }

    #[test]
    fn test_parse_rejects_empty_and_foreign_schemes() {
        assert!(matches!(
            parse_endpoint(""),
            Err(LinkError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            parse_endpoint("http://example.com"),
            Err(LinkError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            parse_endpoint("mqtts://example.com"),
            Err(LinkError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_configure_mqtt_options() {
        let endpoint = parse_endpoint("localhost:1883").unwrap();
        let options =
            configure_mqtt_options("garden-A1B2C3", &endpoint, "token", &MqttSection::default());

        assert_eq!(options.client_id(), "garden-A1B2C3");
        assert_eq!(
            options.broker_address(),
            ("localhost".to_string(), 1883)
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(
            options.credentials(),
            Some(("token".to_string(), String::new()))
        );
    }

    #[test]
    fn test_blank_client_id_falls_back() {
        assert_eq!(normalize_client_id("   "), "thingslink");
        assert_eq!(normalize_client_id(" dev-1 "), "dev-1");
    }

    #[test]
    fn test_topics() {
        assert_eq!(TopicBuilder::telemetry_topic(), "v1/devices/me/telemetry");
        assert_eq!(TopicBuilder::attributes_topic(), "v1/devices/me/attributes");
    }

    #[test]
    fn test_connection_state_equality() {
        assert_eq!(ConnectionState::Connected, ConnectionState::Connected);
        assert_ne!(
            ConnectionState::Connected,
            ConnectionState::Disconnected("test".to_string())
        );
    }
}
