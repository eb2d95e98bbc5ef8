//! Session-wide publication defaults.

use crate::message::{Message, QoS};

/// Homie convention version announced in `$homie`.
pub const HOMIE_VERSION: &str = "4.0.0";

/// Default topic prefix.
pub const DEFAULT_PREFIX: &str = "homie";

/// Topic prefix plus default QoS/retain for every convention message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomieSettings {
    /// Topic root, without trailing slash (e.g. `homie`).
    pub prefix: String,
    pub qos: QoS,
    pub retained: bool,
    /// Subscribe to `<prefix>/$broadcast/#`.
    pub broadcast: bool,
}

impl Default for HomieSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            qos: QoS::AtLeastOnce,
            retained: true,
            broadcast: false,
        }
    }
}

impl HomieSettings {
    /// Build a convention message under `prefix/device_id/` with the default
    /// QoS and retain flag.
    #[must_use]
    pub fn message(&self, device_id: &str, suffix: &str, payload: impl Into<String>) -> Message {
        Message::build(&self.prefix, device_id, suffix, payload, self.qos, self.retained)
    }

    /// Topic filter for Homie broadcasts.
    #[must_use]
    pub fn broadcast_filter(&self) -> String {
        format!("{}/$broadcast/#", self.prefix)
    }

    /// Extract the broadcast level from a `prefix/$broadcast/<level>` topic.
    #[must_use]
    pub fn broadcast_level<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix("/$broadcast/")
            .filter(|level| !level.is_empty())
    }
}
