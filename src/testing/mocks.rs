//! Mock implementations for testing
//!
//! Provides a scripted [`MockLink`] and a hand-driven [`ManualClock`] so the
//! coordinator can be exercised without a broker or real time.

use crate::clock::Clock;
use crate::transport::{LinkError, LinkSession};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// One call made against a [`MockLink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    Connect { endpoint: String, token: String },
    Disconnect,
    SendAttributeText { key: String, value: String },
    SendAttributeInt { key: String, value: i64 },
    SendTelemetry(Vec<u8>),
    Pump,
}

/// Mock link session for testing
///
/// Connect outcomes are taken from a script first and fall back to a default
/// once the script runs dry. Every call is recorded in order.
#[derive(Debug)]
pub struct MockLink {
    connected: bool,
    connect_script: VecDeque<bool>,
    connect_succeeds: bool,
    should_fail_sends: bool,
    calls: Vec<LinkCall>,
}

impl MockLink {
    /// Link whose connects succeed
    pub fn new() -> Self {
        Self {
            connected: false,
            connect_script: VecDeque::new(),
            connect_succeeds: true,
            should_fail_sends: false,
            calls: Vec::new(),
        }
    }

    /// Link whose connects always fail
    pub fn failing() -> Self {
        Self {
            connect_succeeds: false,
            ..Self::new()
        }
    }

    /// Link whose first connects follow `outcomes`, then succeed
    pub fn with_connect_script<I: IntoIterator<Item = bool>>(outcomes: I) -> Self {
        Self {
            connect_script: outcomes.into_iter().collect(),
            ..Self::new()
        }
    }

    pub fn set_connect_succeeds(&mut self, succeeds: bool) {
        self.connect_succeeds = succeeds;
    }

    pub fn set_fail_sends(&mut self, fail: bool) {
        self.should_fail_sends = fail;
    }

    /// Simulate the broker dropping the session
    pub fn drop_connection(&mut self) {
        self.connected = false;
    }

    pub fn calls(&self) -> &[LinkCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn connect_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, LinkCall::Connect { .. }))
            .count()
    }

    /// Telemetry payloads in send order
    pub fn sent_telemetry(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                LinkCall::SendTelemetry(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Attribute sends rendered as `(key, value)` text pairs, in send order
    pub fn sent_attributes(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                LinkCall::SendAttributeText { key, value } => Some((key.clone(), value.clone())),
                LinkCall::SendAttributeInt { key, value } => Some((key.clone(), value.to_string())),
                _ => None,
            })
            .collect()
    }

    fn send_result(&self) -> Result<(), LinkError> {
        if self.should_fail_sends {
            Err(LinkError::PublishFailed("Mock publish failure".into()))
        } else if !self.connected {
            Err(LinkError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkSession for MockLink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self, endpoint: &str, token: &str) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Connect {
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        });

        let succeeds = self
            .connect_script
            .pop_front()
            .unwrap_or(self.connect_succeeds);
        self.connected = succeeds;

        if succeeds {
            Ok(())
        } else {
            Err(LinkError::ConnectionFailed("Mock connection failure".into()))
        }
    }

    async fn disconnect(&mut self) {
        self.calls.push(LinkCall::Disconnect);
        self.connected = false;
    }

    async fn send_attribute_text(&mut self, key: &str, value: &str) -> Result<(), LinkError> {
        self.calls.push(LinkCall::SendAttributeText {
            key: key.to_string(),
            value: value.to_string(),
        });
        self.send_result()
    }

    async fn send_attribute_int(&mut self, key: &str, value: i64) -> Result<(), LinkError> {
        self.calls.push(LinkCall::SendAttributeInt {
            key: key.to_string(),
            value,
        });
        self.send_result()
    }

    async fn send_telemetry(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.calls.push(LinkCall::SendTelemetry(payload.to_vec()));
        self.send_result()
    }

    async fn pump(&mut self) {
        self.calls.push(LinkCall::Pump);
    }
}

/// Clock driven by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u32) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    /// Move time forward, wrapping at `u32::MAX`
    pub fn advance(&self, delta_ms: u32) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}
