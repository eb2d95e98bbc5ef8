//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the Homie core and the outside world.
//! They live here (in `app`) so that both the client and the adapters can
//! depend on them without creating circular dependencies.

pub mod component;
pub mod transport;

pub use component::{Component, PropertyUpdate};
pub use transport::{Transport, TransportEvent};
