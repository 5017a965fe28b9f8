//! MQTT link for the ThingsBoard-style device API
//!
//! This module separates pure functions from I/O operations:
//!
//! - [`connection`] - Endpoint parsing, client options and topic names
//! - [`message_handler`] - Event routing and payload formatting
//! - [`client`] - The [`MqttLink`] session driving rumqttc
//!
//! # Usage
//!
//! ```rust,no_run
//! use thingslink::config::MqttSection;
//! use thingslink::transport::mqtt::MqttLink;
//! use thingslink::transport::LinkSession;
//!
//! # tokio_test::block_on(async {
//! let mut link = MqttLink::new("garden-A1B2C3", MqttSection::default());
//! link.connect("mqtt://demo.thingsboard.io:1883", "ACCESS_TOKEN").await?;
//! link.send_telemetry(br#"{"temp":21}"#).await?;
//! link.pump().await;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

// Re-export public types for convenience
pub use client::MqttLink;
pub use connection::{parse_endpoint, ConnectionState, Endpoint, TopicBuilder};
pub use message_handler::{EventRoute, MessageHandler};
