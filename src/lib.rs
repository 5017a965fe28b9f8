//! ThingsLink - device telemetry session coordinator
//!
//! Keeps a device's session with a ThingsBoard-style endpoint alive and ships
//! buffered telemetry and attributes on a fixed interval.
//!
//! # Overview
//!
//! - [`buffer`] - bounded, key-ordered telemetry and attribute buffers
//! - [`coordinator`] - the connect, retry and flush state machine
//! - [`transport`] - the link contract and its MQTT implementation
//! - [`config`] - TOML device configuration
//! - [`observability`] - structured logging
//!
//! Nothing here spawns tasks. The host loop calls
//! [`Coordinator::tick`](coordinator::Coordinator::tick) as often as it likes
//! and the gates decide when work actually happens.
//!
//! # Quick Start
//!
//! ```rust
//! use thingslink::config::{BufferLimits, DeviceIdentity, SessionConfig};
//! use thingslink::testing::{ManualClock, MockLink};
//! use thingslink::Coordinator;
//!
//! # tokio_test::block_on(async {
//! let identity = DeviceIdentity::new("garden-monitor", "1.4.2", 0xA1B2C3);
//! let session = SessionConfig {
//!     endpoint: "mqtt://localhost:1883".to_string(),
//!     token: "ACCESS_TOKEN".to_string(),
//!     ..SessionConfig::default()
//! };
//! let mut coordinator = Coordinator::new(
//!     identity,
//!     session,
//!     BufferLimits::default(),
//!     MockLink::new(),
//!     ManualClock::new(1_000),
//! );
//!
//! coordinator.set_telemetry("temp", 21);
//! let report = coordinator.tick().await;
//! assert!(report.flushed);
//! assert_eq!(coordinator.link().sent_telemetry(), vec![br#"{"temp":21}"#.to_vec()]);
//! # });
//! ```

pub mod buffer;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod observability;
pub mod testing;
pub mod transport;

pub use buffer::{BufferKind, KeyValueBuffer, Value};
pub use clock::{Clock, SystemClock};
pub use config::*;
pub use coordinator::{Coordinator, SessionPhase, SessionState, TickReport};
pub use error::{TelemetryError, TelemetryResult};
pub use transport::mqtt::MqttLink;
pub use transport::{LinkError, LinkSession};
