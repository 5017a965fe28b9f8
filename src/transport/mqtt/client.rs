//! Impure I/O operations for the MQTT link
//!
//! The rumqttc event loop is never spawned onto its own task. It only
//! advances inside [`MqttLink::connect`] (bounded by the connect timeout),
//! inside a send whose request channel is full (bounded by the send timeout)
//! and inside [`MqttLink::pump`] (bounded by the pump budget), so all network
//! activity happens on the caller's tick.

use super::connection::{configure_mqtt_options, parse_endpoint, ConnectionState, TopicBuilder};
use super::message_handler::{EventRoute, MessageHandler};
use crate::buffer::Value;
use crate::config::MqttSection;
use crate::transport::{LinkError, LinkSession};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Outgoing, QoS};
use std::time::{Duration, Instant};
use tokio::time::timeout_at;
use tracing::{debug, info, warn, Instrument};

/// MQTT-backed link session for the device telemetry API
pub struct MqttLink {
    client_id: String,
    config: MqttSection,
    session: Option<ActiveSession>,
    state: ConnectionState,
    connect_time: Option<Instant>,
    sessions_established: u32,
}

struct ActiveSession {
    client: AsyncClient,
    event_loop: EventLoop,
}

/// Result of driving the event loop by one event
enum PollOutcome {
    Progressed,
    BudgetSpent,
    Lost(String),
}

impl MqttLink {
    pub fn new<S: Into<String>>(client_id: S, config: MqttSection) -> Self {
        Self {
            client_id: client_id.into(),
            config,
            session: None,
            state: ConnectionState::Idle,
            connect_time: None,
            sessions_established: 0,
        }
    }

    /// Get current connection state
    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// Poll the event loop until the broker acknowledges the session
    async fn wait_for_connection_confirmation(
        event_loop: &mut EventLoop,
        timeout: Duration,
    ) -> Result<(), LinkError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                let event = event_loop.poll().await.map_err(|e| match e {
                    ConnectionError::ConnectionRefused(code) => {
                        LinkError::ConnectionRefused(format!("{code:?}"))
                    }
                    other => LinkError::ConnectionFailed(Box::new(other)),
                })?;
                match MessageHandler::route_mqtt_event(&event) {
                    EventRoute::ConnectionAcknowledged => return Ok(()),
                    EventRoute::ConnectionRefused(reason) => {
                        return Err(LinkError::ConnectionRefused(reason))
                    }
                    _ => continue,
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(LinkError::ConnectTimeout(timeout.as_millis() as u64)),
        }
    }

    /// Drive the event loop until it yields one event or `deadline` passes
    async fn poll_once(&mut self, deadline: tokio::time::Instant) -> PollOutcome {
        let Some(session) = self.session.as_mut() else {
            return PollOutcome::Lost("No session".to_string());
        };

        match timeout_at(deadline, session.event_loop.poll()).await {
            Err(_) => PollOutcome::BudgetSpent,
            Ok(Ok(event)) => match MessageHandler::route_mqtt_event(&event) {
                EventRoute::Disconnected => PollOutcome::Lost("Broker disconnected".to_string()),
                EventRoute::MessageReceived { topic, payload_len } => {
                    debug!(topic = %topic, bytes = payload_len, "Ignoring downlink message");
                    PollOutcome::Progressed
                }
                EventRoute::InfrastructureEvent(event) => {
                    tracing::trace!(target: "mqtt_transport", "MQTT event: {}", event);
                    PollOutcome::Progressed
                }
                _ => PollOutcome::Progressed,
            },
            Ok(Err(e)) => PollOutcome::Lost(e.to_string()),
        }
    }

    /// Queue a QoS 0 publish, writing queued requests out while the channel is full
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), LinkError> {
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.send_timeout_ms);

        loop {
            let session = match (&self.session, &self.state) {
                (Some(session), ConnectionState::Connected) => session,
                _ => return Err(LinkError::NotConnected),
            };

            // No retain: telemetry is best effort
            let rejected = match session
                .client
                .try_publish(topic, QoS::AtMostOnce, false, payload.clone())
            {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            match self.poll_once(deadline).await {
                PollOutcome::Progressed => continue,
                PollOutcome::BudgetSpent => {
                    return Err(LinkError::PublishFailed(Box::new(rejected)));
                }
                PollOutcome::Lost(reason) => {
                    self.mark_down(reason);
                    return Err(LinkError::NotConnected);
                }
            }
        }
    }

    async fn send_attribute(&mut self, key: &str, value: &Value) -> Result<(), LinkError> {
        let payload = MessageHandler::format_attribute_payload(key, value)?;
        self.publish(TopicBuilder::attributes_topic(), payload).await
    }

    fn mark_down(&mut self, reason: String) {
        let uptime_ms = self
            .connect_time
            .take()
            .map(|t| t.elapsed().as_millis() as u64);
        warn!(reason = %reason, uptime_ms = ?uptime_ms, "MQTT session lost");
        self.session = None;
        self.state = ConnectionState::Disconnected(reason);
    }
}

#[async_trait]
impl LinkSession for MqttLink {
    fn is_connected(&self) -> bool {
        self.session.is_some() && self.state == ConnectionState::Connected
    }

    async fn connect(&mut self, endpoint: &str, token: &str) -> Result<(), LinkError> {
        // Any previous session is replaced
        self.session = None;
        self.state = ConnectionState::Connecting;

        let span = crate::link_span!(endpoint = %endpoint, client_id = %self.client_id);
        let client_id = self.client_id.clone();
        let config = self.config.clone();
        let result = async move {
            let endpoint = parse_endpoint(endpoint)?;
            let mqtt_options = configure_mqtt_options(&client_id, &endpoint, token, &config);
            let (client, mut event_loop) = AsyncClient::new(mqtt_options, config.channel_capacity);

            let timeout = Duration::from_millis(config.connect_timeout_ms);
            Self::wait_for_connection_confirmation(&mut event_loop, timeout).await?;
            Ok::<_, LinkError>(ActiveSession { client, event_loop })
        }
        .instrument(span)
        .await;

        match result {
            Ok(session) => {
                self.sessions_established += 1;
                info!(
                    client_id = %self.client_id,
                    session = self.sessions_established,
                    "MQTT session established"
                );
                self.session = Some(session);
                self.state = ConnectionState::Connected;
                self.connect_time = Some(Instant::now());
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected(e.to_string());
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.client.try_disconnect() {
                debug!("Failed to queue MQTT disconnect: {}", e);
            } else {
                // Write out whatever is queued, DISCONNECT last
                let deadline = tokio::time::Instant::now()
                    + Duration::from_millis(self.config.pump_budget_ms);
                while let Ok(Ok(event)) = timeout_at(deadline, session.event_loop.poll()).await {
                    if matches!(event, Event::Outgoing(Outgoing::Disconnect)) {
                        break;
                    }
                }
            }
            info!("MQTT client disconnected");
        }
        self.connect_time = None;
        self.state = ConnectionState::Disconnected("Client disconnected".to_string());
    }

    async fn send_attribute_text(&mut self, key: &str, value: &str) -> Result<(), LinkError> {
        self.send_attribute(key, &Value::from(value)).await
    }

    async fn send_attribute_int(&mut self, key: &str, value: i64) -> Result<(), LinkError> {
        self.send_attribute(key, &Value::Integer(value)).await
    }

    async fn send_telemetry(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.publish(TopicBuilder::telemetry_topic(), payload.to_vec())
            .await
    }

    async fn pump(&mut self) {
        if self.session.is_none() {
            return;
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.config.pump_budget_ms);

        loop {
            match self.poll_once(deadline).await {
                PollOutcome::Progressed => continue,
                // Budget spent with nothing pending
                PollOutcome::BudgetSpent => break,
                PollOutcome::Lost(reason) => {
                    self.mark_down(reason);
                    break;
                }
            }
        }
    }
}
