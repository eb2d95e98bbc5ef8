//! MQTT adapter error types.

use homie_domain::error::HomieError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// No session was created yet.
    #[error("MQTT client not connected")]
    NotConnected,

    /// The session exists, so the connect options (last will) are frozen.
    #[error("MQTT client already connected")]
    AlreadyConnected,

    /// The rumqttc client rejected a request (e.g. the queue is full).
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),
}

impl MqttError {
    /// Convert into a [`HomieError::Transport`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> HomieError {
        HomieError::Transport(Box::new(self))
    }
}

impl From<MqttError> for HomieError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Client(err)
    }
}
