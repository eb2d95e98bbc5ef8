//! Virtual switch: responds to `turn_on`, `turn_off`, `toggle` and to `/set`.

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

/// Registry tag of [`VirtualSwitch`].
pub const TAG: &str = "switch";

/// A simulated switch that can be turned on and off.
#[derive(Debug)]
pub struct VirtualSwitch {
    name: String,
    node_id: Option<String>,
    state: Arc<Mutex<bool>>,
    link: Link,
}

impl VirtualSwitch {
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

    pub fn turn_on(&self) {
        self.set(true);
    }

    pub fn turn_off(&self) {
        self.set(false);
    }

    pub fn toggle(&self) {
        let next = !self.is_on();
        self.set(next);
    }

    fn set(&self, on: bool) {
        *lock(&self.state) = on;
        self.link.push("state", PropertyValue::Boolean(on));
    }

    /// Raise or clear a simulated fault, reported as device `alert`.
    pub fn set_fault(&self, faulted: bool) {
        self.link.set_fault(faulted);
    }
}

impl Component for VirtualSwitch {
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

/// Node class: settable boolean `state`.
///
/// An accepted `/set` flips the switch and reports the new state back.
///
/// # Errors
///
/// Fails when `component` is not a [`VirtualSwitch`].
pub fn build_node(component: &dyn Component, binding: &NodeBinding) -> Result<Node, HomieError> {
    let switch: &VirtualSwitch = downcast(component, "switch")?;
    switch.link.bind(binding);

    let state = Arc::clone(&switch.state);
    let echo = binding.clone();
    let property = Property::builder()
        .id("state")
        .name("State")
        .datatype(DataType::Boolean)
        .settable(true)
        .value(PropertyValue::Boolean(switch.is_on()))
        .on_set(move |value| {
            if let PropertyValue::Boolean(on) = value {
                *lock(&state) = *on;
                echo.push("state", value.clone());
            }
        })
        .build()?;

    Node::builder()
        .id(binding.node_id.as_str())
        .name(switch.name.as_str())
        .node_type(TAG)
        .property(property)
        .build()
}
