//! Link session to the telemetry endpoint
//!
//! The coordinator talks to the endpoint only through [`LinkSession`]. The
//! production implementation is [`mqtt::MqttLink`]; tests substitute
//! [`crate::testing::MockLink`].

use thiserror::Error;

pub mod mqtt;

/// Errors raised by a link session
///
/// All of them are non-fatal to the coordinator, which logs them and moves on.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Invalid endpoint: '{0}'")]
    InvalidEndpoint(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),
    #[error("No connection acknowledgement within {0}ms")]
    ConnectTimeout(u64),
    #[error("Not connected")]
    NotConnected,
    #[error("Publishing failed: {0}")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Serialization error")]
    Serialization(#[source] serde_json::Error),
}

/// Connection and send primitives the coordinator drives once per tick
///
/// Implementations must not block beyond their own bounded timeouts: the
/// connect timeout for [`connect`](Self::connect) and a short pump budget for
/// [`pump`](Self::pump). Sends are fire-and-forget submissions with no
/// acknowledgement.
#[async_trait::async_trait]
pub trait LinkSession: Send {
    /// Check if a session is currently live (no side effects)
    fn is_connected(&self) -> bool;

    /// Establish a session with `endpoint`, authenticating with `token`
    ///
    /// Values are used as given; an empty endpoint or token is expected to
    /// fail here rather than being rejected earlier.
    async fn connect(&mut self, endpoint: &str, token: &str) -> Result<(), LinkError>;

    /// Close the session, best effort
    async fn disconnect(&mut self);

    /// Publish a single text attribute update
    async fn send_attribute_text(&mut self, key: &str, value: &str) -> Result<(), LinkError>;

    /// Publish a single integer attribute update
    async fn send_attribute_int(&mut self, key: &str, value: i64) -> Result<(), LinkError>;

    /// Publish one serialized telemetry snapshot
    async fn send_telemetry(&mut self, payload: &[u8]) -> Result<(), LinkError>;

    /// Drive keepalive and receive processing for a bounded time
    async fn pump(&mut self);
}
