//! Transport port: the MQTT session as seen by the Homie client.
//!
//! Every call is a fire-and-forget *submission*. A successful return means
//! the request was queued for the wire, not that the broker acknowledged it;
//! QoS 1/2 delivery is the transport's business.

use homie_domain::error::HomieError;
use homie_domain::message::{Message, QoS};

/// Outbound half of an MQTT session.
///
/// Implementations live in adapter crates (e.g. `adapters/mqtt`). The
/// inbound half (connect/disconnect notifications and incoming publishes) is
/// delivered to the device loop as [`TransportEvent`]s.
pub trait Transport: Send + Sync {
    /// Arm the MQTT last will. Must be called before the session connects.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the session is already
    /// connected and the will can no longer be changed.
    fn set_last_will(&mut self, will: Message) -> Result<(), HomieError>;

    /// Submit a publish.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the request cannot be queued.
    fn publish(&self, message: &Message) -> Result<(), HomieError>;

    /// Submit a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the request cannot be queued.
    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), HomieError>;

    /// Submit a clean disconnect, which cancels the last will at the broker.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the request cannot be queued.
    fn disconnect(&self) -> Result<(), HomieError>;
}

/// Session events delivered to the device loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the session (CONNACK).
    Connected,
    /// The session dropped; the transport reconnects on its own.
    Disconnected,
    /// An incoming publish on one of our subscriptions.
    Message { topic: String, payload: String },
}
