//! [`Transport`] over a rumqttc [`AsyncClient`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rumqttc::{AsyncClient, LastWill, MqttOptions};

use homie_app::ports::Transport;
use homie_domain::error::HomieError;
use homie_domain::message::{Message, QoS};

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::session::MqttSession;

pub(crate) fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// Outbound half of the MQTT session.
///
/// Starts unconnected so the last will can still be armed; [`connect`]
/// freezes the options and hands out the [`MqttSession`] driving the wire.
/// Clones share the client, including clones taken before connecting.
///
/// [`connect`]: Self::connect
#[derive(Debug, Clone)]
pub struct MqttTransport {
    options: MqttOptions,
    capacity: usize,
    reconnect_delay: Duration,
    client: Arc<OnceLock<AsyncClient>>,
}

impl MqttTransport {
    #[must_use]
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            options: config.options(),
            capacity: config.request_capacity,
            reconnect_delay: config.reconnect_delay(),
            client: Arc::default(),
        }
    }

    /// Grow the request queue so at least `requests` submissions fit
    /// without the event loop draining in between. Only effective before
    /// [`connect`](Self::connect).
    pub fn reserve(&mut self, requests: usize) {
        if requests > self.capacity {
            tracing::debug!(from = self.capacity, to = requests, "request queue grown");
            self.capacity = requests;
        }
    }

    /// Request queue capacity the session is (or will be) created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create the client and spawn the task polling its event loop.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MqttError::AlreadyConnected`] when called twice.
    pub fn connect(&mut self) -> Result<MqttSession, MqttError> {
        if self.client.get().is_some() {
            return Err(MqttError::AlreadyConnected);
        }
        let (client, eventloop) = AsyncClient::new(self.options.clone(), self.capacity);
        self.client
            .set(client)
            .map_err(|_| MqttError::AlreadyConnected)?;
        tracing::info!(
            broker = ?self.options.broker_address(),
            client_id = %self.options.client_id(),
            capacity = self.capacity,
            "mqtt session created"
        );
        Ok(MqttSession::spawn(eventloop, self.reconnect_delay))
    }

    fn client(&self) -> Result<&AsyncClient, MqttError> {
        self.client.get().ok_or(MqttError::NotConnected)
    }
}

impl Transport for MqttTransport {
    fn set_last_will(&mut self, will: Message) -> Result<(), HomieError> {
        if self.client.get().is_some() {
            return Err(MqttError::AlreadyConnected.into());
        }
        self.options.set_last_will(LastWill::new(
            will.topic,
            will.payload,
            to_rumqttc(will.qos),
            will.retain,
        ));
        Ok(())
    }

    fn publish(&self, message: &Message) -> Result<(), HomieError> {
        self.client()?
            .try_publish(
                message.topic.as_str(),
                to_rumqttc(message.qos),
                message.retain,
                message.payload.clone(),
            )
            .map_err(MqttError::from)?;
        Ok(())
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), HomieError> {
        self.client()?
            .try_subscribe(topic, to_rumqttc(qos))
            .map_err(MqttError::from)?;
        tracing::debug!(topic, "subscription submitted");
        Ok(())
    }

    fn disconnect(&self) -> Result<(), HomieError> {
        self.client()?.try_disconnect().map_err(MqttError::from)?;
        Ok(())
    }
}
