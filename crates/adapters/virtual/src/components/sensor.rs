//! Virtual sensor: a read-only numeric reading with a unit.

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

/// Registry tag of [`VirtualSensor`].
pub const TAG: &str = "sensor";

/// A simulated sensor, e.g. a thermometer.
///
/// Sensors are read-only: the reading only changes through
/// [`set_reading`](Self::set_reading).
#[derive(Debug)]
pub struct VirtualSensor {
    name: String,
    node_id: Option<String>,
    unit: Option<String>,
    reading: Arc<Mutex<f64>>,
    link: Link,
}

impl VirtualSensor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        node_id: Option<String>,
        unit: Option<String>,
        reading: f64,
    ) -> Self {
        Self {
            name: name.into(),
            node_id,
            unit,
            reading: Arc::new(Mutex::new(reading)),
            link: Link::default(),
        }
    }

    #[must_use]
    pub fn reading(&self) -> f64 {
        *lock(&self.reading)
    }

    /// Record a new reading and report it. Non-finite readings are ignored.
    pub fn set_reading(&self, reading: f64) {
        if !reading.is_finite() {
            tracing::warn!(sensor = %self.name, reading, "ignoring non-finite reading");
            return;
        }
        *lock(&self.reading) = reading;
        self.link.push("value", PropertyValue::Float(reading));
    }

    /// Raise or clear a simulated fault, reported as device `alert`.
    pub fn set_fault(&self, faulted: bool) {
        self.link.set_fault(faulted);
    }
}

impl Component for VirtualSensor {
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

/// Node class: read-only float `value`, with `$unit` when configured.
///
/// # Errors
///
/// Fails when `component` is not a [`VirtualSensor`].
pub fn build_node(component: &dyn Component, binding: &NodeBinding) -> Result<Node, HomieError> {
    let sensor: &VirtualSensor = downcast(component, "sensor")?;
    sensor.link.bind(binding);

    let mut value = Property::builder()
        .id("value")
        .name("Value")
        .datatype(DataType::Float)
        .value(PropertyValue::Float(sensor.reading()));
    if let Some(unit) = &sensor.unit {
        value = value.unit(unit.as_str());
    }

    Node::builder()
        .id(binding.node_id.as_str())
        .name(sensor.name.as_str())
        .node_type(TAG)
        .property(value.build()?)
        .build()
}
