//! # homie-adapter-mqtt
//!
//! MQTT adapter: the [`Transport`](homie_app::ports::Transport) port over
//! `rumqttc`.
//!
//! ## Responsibilities
//! - Build the broker connection from [`MqttConfig`]
//! - Arm the last will before the session connects
//! - Submit publishes, subscriptions and the clean disconnect without
//!   waiting for acknowledgements
//! - Poll the event loop in its own task and report connect / disconnect /
//!   incoming publishes to the device loop
//!
//! ## Dependency rule
//! Same as other adapters: depends on `homie-app` and `homie-domain`.

pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use config::MqttConfig;
pub use error::MqttError;
pub use session::MqttSession;
pub use transport::MqttTransport;
