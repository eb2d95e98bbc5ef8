//! Component port: runtime objects that may expose a Homie node.

use std::any::Any;

use homie_domain::id::NodeId;
use homie_domain::value::PropertyValue;

/// A runtime component (switch, sensor, …) owned by the firmware.
///
/// The core never knows concrete component types. A component opts into
/// Homie by returning a node id from [`homie_node_id`](Self::homie_node_id);
/// assembly then resolves its [`type_tag`](Self::type_tag) in the
/// [`Registry`](crate::registry::Registry) to build the node.
pub trait Component: Send + Sync {
    /// Registry key of the component type (e.g. `"switch"`).
    fn type_tag(&self) -> &str;

    /// Human name, used as the node `$name`.
    fn name(&self) -> &str;

    /// Node id to expose the component under, or `None` to stay hidden.
    fn homie_node_id(&self) -> Option<&str>;

    /// Downcast hook for node classes that need the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Application health: any faulted component puts the device in
    /// `alert` until it recovers.
    fn is_faulted(&self) -> bool {
        false
    }
}

/// A local value change pushed by a component, to be published by the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyUpdate {
    pub node_id: NodeId,
    pub property_id: String,
    pub value: PropertyValue,
}
