//! Topic-safe identifier newtypes.
//!
//! Homie ids become MQTT topic levels, so they are restricted to
//! lowercase ASCII letters, digits and hyphens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whether `value` is a valid Homie id: `[a-z0-9-]+`, not starting with a
/// hyphen.
#[must_use]
pub fn is_topic_safe(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident, $kind:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::InvalidId`] when `value` is empty,
            /// starts with a hyphen or contains characters outside `[a-z0-9-]`.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if is_topic_safe(&value) {
                    Ok(Self(value))
                } else {
                    Err(ValidationError::InvalidId { kind: $kind, value })
                }
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Device`](crate::device::Device), the second topic level.
    DeviceId,
    "device"
);

define_id!(
    /// Identifier of a [`Node`](crate::node::Node), unique within its device.
    NodeId,
    "node"
);

define_id!(
    /// Identifier of a [`Property`](crate::property::Property), unique within its node.
    PropertyId,
    "property"
);

impl DeviceId {
    /// Derive a device id from a free-form firmware name.
    ///
    /// Letters are lowercased, every run of other characters collapses into a
    /// single hyphen, and leading/trailing hyphens are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidId`] when nothing usable remains.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        let mut id = String::with_capacity(name.len());
        for c in name.chars() {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                id.push(c);
            } else if !id.is_empty() && !id.ends_with('-') {
                id.push('-');
            }
        }
        while id.ends_with('-') {
            id.pop();
        }
        if id.is_empty() {
            return Err(ValidationError::InvalidId {
                kind: "device",
                value: name.to_string(),
            });
        }
        Ok(Self(id))
    }
}
