//! Virtual light: power, brightness and RGB color, all settable.

use std::any::Any;
use std::sync::{Arc, Mutex};

use homie_app::ports::Component;
use homie_app::registry::NodeBinding;
use homie_domain::datatype::DataType;
use homie_domain::error::HomieError;
use homie_domain::node::Node;
use homie_domain::property::Property;
use homie_domain::value::{Color, PropertyValue};

use super::{Link, downcast, lock};

/// Registry tag of [`VirtualLight`].
pub const TAG: &str = "light";

const MAX_BRIGHTNESS: i64 = 100;

/// Snapshot of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    pub power: bool,
    /// Percent, `0..=100`.
    pub brightness: i64,
    pub color: (u8, u8, u8),
}

impl Default for LightState {
    fn default() -> Self {
        Self {
            power: false,
            brightness: MAX_BRIGHTNESS,
            color: (255, 255, 255),
        }
    }
}

/// A simulated dimmable RGB light.
#[derive(Debug)]
pub struct VirtualLight {
    name: String,
    node_id: Option<String>,
    state: Arc<Mutex<LightState>>,
    link: Link,
}

impl VirtualLight {
    #[must_use]
    pub fn new(name: impl Into<String>, node_id: Option<String>, state: LightState) -> Self {
        Self {
            name: name.into(),
            node_id,
            state: Arc::new(Mutex::new(state)),
            link: Link::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> LightState {
        *lock(&self.state)
    }

    pub fn turn_on(&self) {
        self.set_power(true);
    }

    pub fn turn_off(&self) {
        self.set_power(false);
    }

    pub fn toggle(&self) {
        let next = !self.state().power;
        self.set_power(next);
    }

    /// Set the brightness, clamped to `0..=100`.
    pub fn set_brightness(&self, brightness: i64) {
        let brightness = brightness.clamp(0, MAX_BRIGHTNESS);
        lock(&self.state).brightness = brightness;
        self.link
            .push("brightness", PropertyValue::Integer(brightness));
    }

    pub fn set_color(&self, r: u8, g: u8, b: u8) {
        lock(&self.state).color = (r, g, b);
        self.link
            .push("color", PropertyValue::Color(Color::Rgb(r, g, b)));
    }

    fn set_power(&self, power: bool) {
        lock(&self.state).power = power;
        self.link.push("power", PropertyValue::Boolean(power));
    }

    /// Raise or clear a simulated fault, reported as device `alert`.
    pub fn set_fault(&self, faulted: bool) {
        self.link.set_fault(faulted);
    }
}

impl Component for VirtualLight {
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

/// Node class: settable `power` (boolean), `brightness` (integer `0:100`,
/// `%`) and `color` (color `rgb`).
///
/// Accepted `/set` values are applied and reported back.
///
/// # Errors
///
/// Fails when `component` is not a [`VirtualLight`].
pub fn build_node(component: &dyn Component, binding: &NodeBinding) -> Result<Node, HomieError> {
    let light: &VirtualLight = downcast(component, "light")?;
    light.link.bind(binding);
    let current = light.state();

    let power = {
        let (state, echo) = (Arc::clone(&light.state), binding.clone());
        Property::builder()
            .id("power")
            .name("Power")
            .datatype(DataType::Boolean)
            .settable(true)
            .value(PropertyValue::Boolean(current.power))
            .on_set(move |value| {
                if let PropertyValue::Boolean(on) = value {
                    lock(&state).power = *on;
                    echo.push("power", value.clone());
                }
            })
            .build()?
    };

    let brightness = {
        let (state, echo) = (Arc::clone(&light.state), binding.clone());
        Property::builder()
            .id("brightness")
            .name("Brightness")
            .datatype(DataType::Integer)
            .format(format!("0:{MAX_BRIGHTNESS}"))
            .unit("%")
            .settable(true)
            .value(PropertyValue::Integer(current.brightness))
            .on_set(move |value| {
                if let PropertyValue::Integer(level) = value {
                    lock(&state).brightness = *level;
                    echo.push("brightness", value.clone());
                }
            })
            .build()?
    };

    let color = {
        let (state, echo) = (Arc::clone(&light.state), binding.clone());
        let (r, g, b) = current.color;
        Property::builder()
            .id("color")
            .name("Color")
            .datatype(DataType::Color)
            .format("rgb")
            .settable(true)
            .value(PropertyValue::Color(Color::Rgb(r, g, b)))
            .on_set(move |value| {
                if let PropertyValue::Color(Color::Rgb(r, g, b)) = value {
                    lock(&state).color = (*r, *g, *b);
                    echo.push("color", value.clone());
                }
            })
            .build()?
    };

    Node::builder()
        .id(binding.node_id.as_str())
        .name(light.name.as_str())
        .node_type(TAG)
        .property(power)
        .property(brightness)
        .property(color)
        .build()
}
