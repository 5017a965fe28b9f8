//! Pure event routing and payload formatting for the MQTT link

use crate::buffer::Value;
use crate::transport::LinkError;
use rumqttc::{ConnectReturnCode, Event, Packet};
use std::collections::BTreeMap;

/// Pure routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route an event loop event to the link's reaction (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(ack) if ack.code == ConnectReturnCode::Success => {
                    EventRoute::ConnectionAcknowledged
                }
                Packet::ConnAck(ack) => EventRoute::ConnectionRefused(format!("{:?}", ack.code)),
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: publish.topic.clone(),
                    payload_len: publish.payload.len(),
                },
                Packet::Disconnect => EventRoute::Disconnected,
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Format one attribute update as `{"key": value}` (pure function)
    pub fn format_attribute_payload(key: &str, value: &Value) -> Result<Vec<u8>, LinkError> {
        let document: BTreeMap<&str, &Value> = std::iter::once((key, value)).collect();
        serde_json::to_vec(&document).map_err(LinkError::Serialization)
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Session accepted, ready to publish
    ConnectionAcknowledged,
    /// Broker answered the connect with a failure code
    ConnectionRefused(String),
    /// Downlink message (RPC or shared attribute update); logged only
    MessageReceived { topic: String, payload_len: usize },
    /// Broker closed the session
    Disconnected,
    /// Infrastructure event (PingResp, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}
