//! Virtual binary sensor: a read-only on/off signal (door contact, motion).

use std::any::Any;
use std::sync::{Arc, Mutex};

use homie_app::ports::Component;
use homie_app::registry::NodeBinding;
use homie_domain::datatype::DataType;
use homie_domain::error::HomieError;
use homie_domain::node::Node;
use homie_domain::property::Property;
use homie_domain::value::PropertyValue;

use super::{Link, downcast, lock};

/// Registry tag of [`VirtualBinarySensor`].
pub const TAG: &str = "binary-sensor";

#[derive(Debug)]
pub struct VirtualBinarySensor {
    name: String,
    node_id: Option<String>,
    state: Arc<Mutex<bool>>,
    link: Link,
}

impl VirtualBinarySensor {
    #[must_use]
    pub fn new(name: impl Into<String>, node_id: Option<String>, on: bool) -> Self {
        Self {
            name: name.into(),
            node_id,
            state: Arc::new(Mutex::new(on)),
            link: Link::default(),
        }
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        *lock(&self.state)
    }

    /// Report a new state; unchanged states are not pushed.
    pub fn set(&self, on: bool) {
        let changed = {
            let mut state = lock(&self.state);
            std::mem::replace(&mut *state, on) != on
        };
        if changed {
            self.link.push("state", PropertyValue::Boolean(on));
        }
    }

    /// Raise or clear a simulated fault, reported as device `alert`.
    pub fn set_fault(&self, faulted: bool) {
        self.link.set_fault(faulted);
    }
}

impl Component for VirtualBinarySensor {
    fn type_tag(&self) -> &str {
        TAG
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn homie_node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_faulted(&self) -> bool {
        self.link.is_faulted()
    }
}

/// Node class: read-only boolean `state`.
///
/// # Errors
///
/// Fails when `component` is not a [`VirtualBinarySensor`].
pub fn build_node(component: &dyn Component, binding: &NodeBinding) -> Result<Node, HomieError> {
    let sensor: &VirtualBinarySensor = downcast(component, "binary sensor")?;
    sensor.link.bind(binding);

    Node::builder()
        .id(binding.node_id.as_str())
        .name(sensor.name.as_str())
        .node_type(TAG)
        .property(
            Property::builder()
                .id("state")
                .name("State")
                .datatype(DataType::Boolean)
                .value(PropertyValue::Boolean(sensor.is_on()))
                .build()?,
        )
        .build()
}
