//! # homie-domain
//!
//! Pure model of a device speaking the Homie convention over MQTT.
//!
//! ## Responsibilities
//! - Typed identifiers and the error taxonomy shared by every layer
//! - The **Device → Node → Property** tree and its attachment rules
//! - Datatypes, formats and the canonical payload encoding of values
//! - The device lifecycle (`$state`) and its allowed transitions
//! - Building every convention [`Message`](message::Message) (topic, payload, QoS, retain)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies** and performs no IO.
//! Publishing and subscribing go through the `Transport` port in `homie-app`.

pub mod error;
pub mod id;
pub mod message;
pub mod settings;

pub mod datatype;
pub mod device;
pub mod node;
pub mod property;
pub mod state;
pub mod stats;
pub mod value;
