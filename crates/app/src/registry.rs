//! Node class registry: component type tag → Homie node constructor.
//!
//! The registry is created by the composition root, filled by every adapter
//! that ships component types, then sealed when device assembly begins.
//! Registration is additive and conflict-checked; a tag is never rebound.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;

use homie_domain::error::HomieError;
use homie_domain::id::NodeId;
use homie_domain::node::Node;
use homie_domain::value::PropertyValue;

use crate::ports::{Component, PropertyUpdate};

/// What a node class receives to bind the node it builds to its component.
#[derive(Debug, Clone)]
pub struct NodeBinding {
    /// Id the node must be built with.
    pub node_id: NodeId,
    /// Channel for pushing local value changes to the device loop.
    pub updates: mpsc::UnboundedSender<PropertyUpdate>,
}

impl NodeBinding {
    /// Queue a local value change for publication.
    ///
    /// A closed channel means the loop is shutting down; the update is
    /// dropped.
    pub fn push(&self, property_id: &str, value: PropertyValue) {
        let update = PropertyUpdate {
            node_id: self.node_id.clone(),
            property_id: property_id.to_string(),
            value,
        };
        if self.updates.send(update).is_err() {
            tracing::debug!(node = %self.node_id, property = property_id, "update channel closed");
        }
    }
}

/// Constructor capability producing the Homie node of one component type.
pub trait NodeClass: Send + Sync {
    /// Build the node for `component`, bound through `binding`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ComponentMismatch`] (as [`HomieError`]) when
    /// `component` is not of the expected concrete type, or any validation
    /// error raised while building the node.
    fn build_node(&self, component: &dyn Component, binding: &NodeBinding)
    -> Result<Node, HomieError>;
}

impl<F> NodeClass for F
where
    F: Fn(&dyn Component, &NodeBinding) -> Result<Node, HomieError> + Send + Sync,
{
    fn build_node(
        &self,
        component: &dyn Component,
        binding: &NodeBinding,
    ) -> Result<Node, HomieError> {
        self(component, binding)
    }
}

/// Errors raised by the [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("node class already registered for type {0:?}")]
    DuplicateType(String),

    #[error("no node class registered for type {0:?}")]
    UnknownType(String),

    #[error("registry is sealed, device assembly has begun")]
    Sealed,

    #[error("component {component:?} is not a {expected}")]
    ComponentMismatch {
        expected: &'static str,
        component: String,
    },
}

impl From<RegistryError> for HomieError {
    fn from(err: RegistryError) -> Self {
        HomieError::Registry(Box::new(err))
    }
}

/// Mapping from component type tag to [`NodeClass`].
#[derive(Default)]
pub struct Registry {
    classes: HashMap<String, Box<dyn NodeClass>>,
    sealed: bool,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("Registry")
            .field("tags", &tags)
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `tag` to `class`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Sealed`] once assembly began and
    /// [`RegistryError::DuplicateType`] when `tag` is already bound.
    pub fn register_node_class(
        &mut self,
        tag: impl Into<String>,
        class: impl NodeClass + 'static,
    ) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed);
        }
        let tag = tag.into();
        if self.classes.contains_key(&tag) {
            return Err(RegistryError::DuplicateType(tag));
        }
        tracing::debug!(tag = %tag, "node class registered");
        self.classes.insert(tag, Box::new(class));
        Ok(())
    }

    /// Merge every binding of `other` into `self`.
    ///
    /// Either all tags are merged or none: a single shared tag rejects the
    /// whole merge.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Sealed`] once assembly began and
    /// [`RegistryError::DuplicateType`] for the first shared tag.
    pub fn extend(&mut self, other: Registry) -> Result<(), RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed);
        }
        if let Some(tag) = other.tags().find(|tag| self.classes.contains_key(*tag)) {
            return Err(RegistryError::DuplicateType(tag.to_string()));
        }
        self.classes.extend(other.classes);
        Ok(())
    }

    /// Look up the node class bound to `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownType`] when nothing is bound.
    pub fn resolve(&self, tag: &str) -> Result<&dyn NodeClass, RegistryError> {
        self.classes
            .get(tag)
            .map(Box::as_ref)
            .ok_or_else(|| RegistryError::UnknownType(tag.to_string()))
    }

    /// Mark device assembly as begun; later registrations fail.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Bound type tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}
