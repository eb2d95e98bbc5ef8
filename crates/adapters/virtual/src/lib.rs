//! # homie-adapter-virtual
//!
//! Simulated components exposed as Homie nodes, for demos and tests.
//!
//! ## Provided node classes
//!
//! | Type tag | Component | Properties |
//! |----------|-----------|------------|
//! | `switch` | [`VirtualSwitch`] | settable boolean `state` |
//! | `sensor` | [`VirtualSensor`] | float `value` with optional unit |
//! | `binary-sensor` | [`VirtualBinarySensor`] | boolean `state` |
//! | `light` | [`VirtualLight`] | settable `power`, `brightness` (`0:100`), `color` (`rgb`) |
//!
//! ## Dependency rule
//!
//! Depends on `homie-app` (ports and registry) and `homie-domain` only.

mod components;
mod config;

pub use components::{
    LightState, VirtualBinarySensor, VirtualComponent, VirtualLight, VirtualSensor, VirtualSwitch,
};
pub use config::ComponentConfig;

use homie_app::ports::Component;
use homie_app::registry::{Registry, RegistryError};

/// Bind every virtual type tag to its node class.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateType`] when another adapter already
/// claimed one of the tags, and [`RegistryError::Sealed`] after assembly
/// began. Nothing is registered in either case.
pub fn register_node_classes(registry: &mut Registry) -> Result<(), RegistryError> {
    let mut classes = Registry::new();
    classes.register_node_class(components::switch::TAG, components::switch::build_node)?;
    classes.register_node_class(components::sensor::TAG, components::sensor::build_node)?;
    classes.register_node_class(
        components::binary_sensor::TAG,
        components::binary_sensor::build_node,
    )?;
    classes.register_node_class(components::light::TAG, components::light::build_node)?;
    registry.extend(classes)
}

/// The set of virtual components driven by the daemon.
#[derive(Debug)]
pub struct VirtualIntegration {
    components: Vec<VirtualComponent>,
}

impl Default for VirtualIntegration {
    /// A kitchen light, a temperature sensor and a relay switch.
    fn default() -> Self {
        Self {
            components: vec![
                VirtualComponent::Light(VirtualLight::new(
                    "Kitchen Light",
                    Some("light".to_string()),
                    LightState::default(),
                )),
                VirtualComponent::Sensor(VirtualSensor::new(
                    "Temperature",
                    Some("temperature".to_string()),
                    Some("°C".to_string()),
                    21.0,
                )),
                VirtualComponent::Switch(VirtualSwitch::new(
                    "Relay",
                    Some("relay".to_string()),
                    false,
                )),
            ],
        }
    }
}

impl VirtualIntegration {
    /// Build from configuration; an empty list falls back to the demo set.
    #[must_use]
    pub fn from_config(configs: &[ComponentConfig]) -> Self {
        if configs.is_empty() {
            return Self::default();
        }
        Self {
            components: configs.iter().map(ComponentConfig::build).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        "virtual"
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(VirtualComponent::as_component)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VirtualComponent> {
        self.components
            .iter()
            .find(|c| c.as_component().name() == name)
    }
}
