//! # homie-app
//!
//! Application layer: the Homie client use-cases and **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Transport`: publish, subscribe, last will, disconnect
//!   - `Component`: runtime objects that may expose a Homie node
//! - Drive the device lifecycle through [`client::HomieClient`]: last will,
//!   announce, value mirroring, stats, health states and graceful shutdown
//! - Map component type tags to node constructors ([`registry::Registry`])
//!   and assemble the device from components ([`assembly::assemble`])
//! - Forward firmware logs to `$log` ([`diagnostics::LogForwarder`])
//!
//! ## Dependency rule
//! Depends on `homie-domain` only (plus `tokio::sync` for channels and
//! `tracing-subscriber` for the log layer). Never imports adapter crates.

pub mod assembly;
pub mod client;
pub mod diagnostics;
pub mod ports;
pub mod registry;
