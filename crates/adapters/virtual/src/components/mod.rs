//! Virtual component implementations: switch, sensor, binary sensor, light.
//!
//! Each component keeps its state behind an `Arc<Mutex<_>>` shared with the
//! `/set` callbacks of its node, and a [`Link`] to push local changes to the
//! device loop once a node was built for it.

pub(crate) mod binary_sensor;
pub(crate) mod light;
pub(crate) mod sensor;
pub(crate) mod switch;

pub use binary_sensor::VirtualBinarySensor;
pub use light::{LightState, VirtualLight};
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use homie_app::ports::Component;
use homie_app::registry::{NodeBinding, RegistryError};
use homie_domain::value::PropertyValue;

/// Wrapper enum for the concrete virtual component types.
#[derive(Debug)]
pub enum VirtualComponent {
    Switch(VirtualSwitch),
    Sensor(VirtualSensor),
    BinarySensor(VirtualBinarySensor),
    Light(VirtualLight),
}

impl VirtualComponent {
    /// Raise or clear a simulated fault on the wrapped component.
    pub fn set_fault(&self, faulted: bool) {
        match self {
            Self::Switch(c) => c.set_fault(faulted),
            Self::Sensor(c) => c.set_fault(faulted),
            Self::BinarySensor(c) => c.set_fault(faulted),
            Self::Light(c) => c.set_fault(faulted),
        }
    }

    #[must_use]
    pub fn as_component(&self) -> &dyn Component {
        match self {
            Self::Switch(c) => c,
            Self::Sensor(c) => c,
            Self::BinarySensor(c) => c,
            Self::Light(c) => c,
        }
    }
}

/// Late-bound route from a component to the device loop, plus its
/// simulated fault flag.
#[derive(Debug, Default)]
pub(crate) struct Link {
    binding: OnceLock<NodeBinding>,
    faulted: AtomicBool,
}

impl Link {
    pub(crate) fn bind(&self, binding: &NodeBinding) {
        if self.binding.set(binding.clone()).is_err() {
            tracing::warn!(node = %binding.node_id, "component already bound, keeping first node");
        }
    }

    /// Push a local change; a no-op until a node was built.
    pub(crate) fn push(&self, property_id: &str, value: PropertyValue) {
        if let Some(binding) = self.binding.get() {
            binding.push(property_id, value);
        }
    }

    pub(crate) fn set_fault(&self, faulted: bool) {
        if self.faulted.swap(faulted, Ordering::Relaxed) != faulted {
            tracing::info!(faulted, "simulated fault changed");
        }
    }

    pub(crate) fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Relaxed)
    }
}

pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn downcast<'a, C: 'static>(
    component: &'a dyn Component,
    expected: &'static str,
) -> Result<&'a C, RegistryError> {
    component
        .as_any()
        .downcast_ref::<C>()
        .ok_or_else(|| RegistryError::ComponentMismatch {
            expected,
            component: component.name().to_string(),
        })
}
