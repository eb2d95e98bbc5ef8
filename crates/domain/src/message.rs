//! Wire-ready MQTT messages and the single place topics are shaped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for QoS {
    type Error = ValidationError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(ValidationError::InvalidQos(other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// An immutable MQTT message ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

impl Message {
    /// Build a message addressed to `prefix/device_id/suffix`.
    ///
    /// The suffix is used verbatim; callers only pass topic-safe suffixes.
    #[must_use]
    pub fn build(
        prefix: &str,
        device_id: &str,
        suffix: &str,
        payload: impl Into<String>,
        qos: QoS,
        retain: bool,
    ) -> Self {
        Self {
            topic: format!("{prefix}/{device_id}/{suffix}"),
            payload: payload.into(),
            qos,
            retain,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.topic, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_join_prefix_device_and_suffix_with_single_slashes() {
        let msg = Message::build("homie", "kitchen-light", "$state", "init", QoS::AtLeastOnce, true);
        assert_eq!(msg.topic, "homie/kitchen-light/$state");
        assert_eq!(msg.payload, "init");
        assert!(msg.retain);
    }

    #[test]
    fn should_not_normalize_suffix() {
        let msg = Message::build("a/b", "dev", "node/prop/$name", "", QoS::AtMostOnce, false);
        assert_eq!(msg.topic, "a/b/dev/node/prop/$name");
    }

    #[test]
    fn should_convert_qos_from_level() {
        assert_eq!(QoS::try_from(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(QoS::try_from(2).unwrap(), QoS::ExactlyOnce);
        assert!(QoS::try_from(3).is_err());
    }

    #[test]
    fn should_deserialize_qos_from_integer() {
        let qos: QoS = serde_json::from_str("2").unwrap();
        assert_eq!(qos, QoS::ExactlyOnce);
        assert!(serde_json::from_str::<QoS>("7").is_err());
    }

    #[test]
    fn should_display_message_as_topic_and_payload() {
        let msg = Message::build("homie", "dev", "$name", "Dev", QoS::AtLeastOnce, true);
        assert_eq!(msg.to_string(), "homie/dev/$name=Dev");
    }
}
