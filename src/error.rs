//! Error taxonomy for the telemetry coordinator
//!
//! None of these errors is fatal. They are produced by the buffer store and
//! the link session, absorbed by the coordinator, and surfaced only through
//! structured logging. A tick never returns one of them.

use crate::buffer::BufferKind;
use crate::transport::LinkError;
use thiserror::Error;

/// Non-fatal failures observed while buffering and flushing telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Connect attempt failed: {0}")]
    ConnectFailure(#[source] LinkError),

    #[error("{buffer} buffer full ({capacity} entries), dropped key '{key}'")]
    CapacityExceeded {
        buffer: BufferKind,
        key: String,
        capacity: usize,
    },

    #[error("Snapshot exceeded {budget} byte budget, dropped {} entries", dropped.len())]
    SerializationOverflow { dropped: Vec<String>, budget: usize },

    #[error("Failed to send '{key}': {source}")]
    TransportSendFailure {
        key: String,
        #[source]
        source: LinkError,
    },
}

impl TelemetryError {
    /// Create a send failure for the given key
    pub fn send_failure<S: Into<String>>(key: S, source: LinkError) -> Self {
        Self::TransportSendFailure {
            key: key.into(),
            source,
        }
    }
}

/// Result type for telemetry operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exceeded_message() {
        let error = TelemetryError::CapacityExceeded {
            buffer: BufferKind::Telemetry,
            key: "humidity".to_string(),
            capacity: 64,
        };
        assert_eq!(
            error.to_string(),
            "telemetry buffer full (64 entries), dropped key 'humidity'"
        );
    }

    #[test]
    fn test_serialization_overflow_counts_dropped_keys() {
        let error = TelemetryError::SerializationOverflow {
            dropped: vec!["x".to_string(), "y".to_string()],
            budget: 64,
        };
        assert_eq!(
            error.to_string(),
            "Snapshot exceeded 64 byte budget, dropped 2 entries"
        );
    }

    #[test]
    fn test_send_failure_keeps_source() {
        use std::error::Error as _;

        let error = TelemetryError::send_failure("fw", LinkError::NotConnected);
        assert!(error.to_string().contains("'fw'"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_connect_failure_display() {
        let error = TelemetryError::ConnectFailure(LinkError::ConnectTimeout(5000));
        assert!(!error.to_string().is_empty());
        assert!(error.to_string().contains("5000"));
    }
}
