//! `[[components]]` entries of the daemon configuration.

use serde::Deserialize;

use crate::components::{
    LightState, VirtualBinarySensor, VirtualComponent, VirtualLight, VirtualSensor, VirtualSwitch,
};

/// One configured virtual component, selected by its `type` key.
///
/// `node_id` is optional: a component without one stays local and is not
/// exposed as a Homie node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ComponentConfig {
    Switch {
        name: String,
        node_id: Option<String>,
        #[serde(default)]
        on: bool,
    },
    Sensor {
        name: String,
        node_id: Option<String>,
        unit: Option<String>,
        #[serde(default)]
        value: f64,
    },
    BinarySensor {
        name: String,
        node_id: Option<String>,
        #[serde(default)]
        on: bool,
    },
    Light {
        name: String,
        node_id: Option<String>,
        #[serde(default)]
        power: bool,
        #[serde(default = "default_brightness")]
        brightness: i64,
        #[serde(default = "default_color")]
        color: [u8; 3],
    },
}

fn default_brightness() -> i64 {
    LightState::default().brightness
}

fn default_color() -> [u8; 3] {
    let (r, g, b) = LightState::default().color;
    [r, g, b]
}

impl ComponentConfig {
    /// Instantiate the configured component.
    #[must_use]
    pub fn build(&self) -> VirtualComponent {
        match self.clone() {
            Self::Switch { name, node_id, on } => {
                VirtualComponent::Switch(VirtualSwitch::new(name, node_id, on))
            }
            Self::Sensor {
                name,
                node_id,
                unit,
                value,
            } => VirtualComponent::Sensor(VirtualSensor::new(name, node_id, unit, value)),
            Self::BinarySensor { name, node_id, on } => {
                VirtualComponent::BinarySensor(VirtualBinarySensor::new(name, node_id, on))
            }
            Self::Light {
                name,
                node_id,
                power,
                brightness,
                color: [r, g, b],
            } => VirtualComponent::Light(VirtualLight::new(
                name,
                node_id,
                LightState {
                    power,
                    brightness: brightness.clamp(0, 100),
                    color: (r, g, b),
                },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        components: Vec<ComponentConfig>,
    }

    #[test]
    fn should_parse_every_component_type() {
        let toml = r#"
            [[components]]
            type = "switch"
            name = "Relay"
            node_id = "relay"
            on = true

            [[components]]
            type = "sensor"
            name = "Temperature"
            node_id = "temperature"
            unit = "°C"
            value = 21.5

            [[components]]
            type = "binary-sensor"
            name = "Door"

            [[components]]
            type = "light"
            name = "Kitchen"
            node_id = "light"
            brightness = 40
        "#;

        let wrapper: Wrapper = toml::from_str(toml).unwrap();

        assert_eq!(wrapper.components.len(), 4);
        assert_eq!(
            wrapper.components[2],
            ComponentConfig::BinarySensor {
                name: "Door".to_string(),
                node_id: None,
                on: false,
            }
        );
        assert_eq!(
            wrapper.components[3],
            ComponentConfig::Light {
                name: "Kitchen".to_string(),
                node_id: Some("light".to_string()),
                power: false,
                brightness: 40,
                color: [255, 255, 255],
            }
        );
    }

    #[test]
    fn should_reject_unknown_component_type() {
        let toml = r#"
            [[components]]
            type = "thermostat"
            name = "Heating"
        "#;
        assert!(toml::from_str::<Wrapper>(toml).is_err());
    }

    #[test]
    fn should_build_light_with_clamped_brightness() {
        let config = ComponentConfig::Light {
            name: "Kitchen".to_string(),
            node_id: None,
            power: true,
            brightness: 400,
            color: [1, 2, 3],
        };
        let VirtualComponent::Light(light) = config.build() else {
            panic!("expected a light");
        };
        assert_eq!(
            light.state(),
            LightState {
                power: true,
                brightness: 100,
                color: (1, 2, 3),
            }
        );
    }
}
