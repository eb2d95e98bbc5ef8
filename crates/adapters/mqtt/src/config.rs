//! MQTT session configuration.

use std::time::Duration;

use rumqttc::MqttOptions;
use serde::Deserialize;

/// Configuration of the broker connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Optional username; the password is only sent along with it.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Start without a persistent broker session.
    pub clean_session: bool,
    /// Capacity of the outgoing request queue.
    pub request_capacity: usize,
    /// Pause between reconnection attempts, in seconds.
    pub reconnect_delay_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "homied".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
            clean_session: true,
            request_capacity: 64,
            reconnect_delay_secs: 5,
        }
    }
}

impl MqttConfig {
    /// Build the rumqttc options (without last will).
    #[must_use]
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker_host, self.broker_port);
        options
            .set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)))
            .set_clean_session(self.clean_session);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}
