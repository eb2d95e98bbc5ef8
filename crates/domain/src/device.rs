//! Device: the root of the Homie tree.
//!
//! The device owns its nodes (in insertion order), tracks the lifecycle
//! state and the latest stats snapshot, and produces every device-level
//! convention message. It never talks to a transport itself: the client in
//! `homie-app` submits the messages and commits state changes afterwards.

use crate::error::{
    DuplicateIdError, HomieError, LateAttachmentError, NotFoundError, ValidationError,
};
use crate::id::{DeviceId, NodeId};
use crate::message::{Message, QoS};
use crate::node::Node;
use crate::property::Property;
use crate::settings::{HOMIE_VERSION, HomieSettings};
use crate::state::DeviceState;
use crate::stats::Stats;

/// A Homie device: identity, lifecycle state, nodes and stats.
#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    name: String,
    attributes: Vec<(String, String)>,
    state: DeviceState,
    announced: bool,
    nodes: Vec<Node>,
    stats: Stats,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Whether the tree was announced at least once (`ready` was reached).
    #[must_use]
    pub fn is_announced(&self) -> bool {
        self.announced
    }

    /// Extra `$`-attributes published after `$name`.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Attach a node. Only allowed before the first announcement.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::LateAttachment`] once the device has announced
    /// itself, or [`HomieError::DuplicateId`] when the id is taken. The
    /// device is unchanged on failure.
    pub fn attach_node(&mut self, node: Node) -> Result<(), HomieError> {
        if self.announced {
            return Err(LateAttachmentError {
                entity: "Node",
                id: node.id().to_string(),
            }
            .into());
        }
        if self.node(node.id().as_str()).is_some() {
            return Err(DuplicateIdError {
                entity: "Node",
                id: node.id().to_string(),
            }
            .into());
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Attach a property to an already attached node.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::LateAttachment`] once announced,
    /// [`HomieError::NotFound`] for an unknown node and
    /// [`HomieError::DuplicateId`] when the property id is taken.
    pub fn attach_property(&mut self, node_id: &str, property: Property) -> Result<(), HomieError> {
        if self.announced {
            return Err(LateAttachmentError {
                entity: "Property",
                id: property.id().to_string(),
            }
            .into());
        }
        let node = self.node_mut(node_id)?;
        node.attach_property(property)?;
        Ok(())
    }

    /// Mutable access to a property together with the ids needed to address
    /// it, for value commits and `/set` handling.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::NotFound`] when the node or property is unknown.
    pub fn property_mut(
        &mut self,
        node_id: &str,
        property_id: &str,
    ) -> Result<(&DeviceId, &NodeId, &mut Property), HomieError> {
        let Self { id, nodes, .. } = self;
        let node = nodes
            .iter_mut()
            .find(|n| n.id() == node_id)
            .ok_or_else(|| NotFoundError {
                entity: "Node",
                id: node_id.to_string(),
            })?;
        let (owner, property) =
            node.split_property_mut(property_id)
                .ok_or_else(|| NotFoundError {
                    entity: "Property",
                    id: format!("{node_id}/{property_id}"),
                })?;
        Ok((&*id, owner, property))
    }

    /// Move to `next`.
    ///
    /// Reaching `ready` marks the tree as announced, which closes attachment.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::InvalidTransition`] when the lifecycle forbids
    /// the move (e.g. anything to `lost`).
    pub fn set_state(&mut self, next: DeviceState) -> Result<(), HomieError> {
        if !self.state.can_transition_to(next) {
            return Err(HomieError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if next == DeviceState::Ready {
            self.announced = true;
        }
        Ok(())
    }

    /// Store a fresh stats snapshot.
    pub fn record_stats(&mut self, stats: Stats) {
        self.stats = stats;
    }

    /// Comma-joined node ids, published as `$nodes`.
    #[must_use]
    pub fn node_list(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.id().as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `$state` message carrying `state`.
    #[must_use]
    pub fn state_message(&self, settings: &HomieSettings, state: DeviceState) -> Message {
        settings.message(self.id.as_str(), "$state", state.as_str())
    }

    /// The `$state=lost` message armed as MQTT last will.
    #[must_use]
    pub fn last_will(&self, settings: &HomieSettings) -> Message {
        Message {
            retain: true,
            ..self.state_message(settings, DeviceState::Lost)
        }
    }

    /// Everything published between `$state=init` and the `/set`
    /// subscriptions: `$homie`, `$name`, device attributes, `$nodes`, then
    /// every node's metadata in insertion order.
    #[must_use]
    pub fn declare_metadata(&self, settings: &HomieSettings) -> Vec<Message> {
        let device_id = self.id.as_str();
        let mut messages = vec![
            settings.message(device_id, "$homie", HOMIE_VERSION),
            settings.message(device_id, "$name", self.name.as_str()),
        ];
        messages.extend(
            self.attributes
                .iter()
                .map(|(key, value)| settings.message(device_id, key, value.as_str())),
        );
        messages.push(settings.message(device_id, "$nodes", self.node_list()));
        for node in &self.nodes {
            messages.extend(node.declare_metadata(settings, &self.id));
        }
        messages
    }

    /// `/set` subscriptions across all nodes.
    #[must_use]
    pub fn subscribe_topics(&self, settings: &HomieSettings) -> Vec<(String, QoS)> {
        self.nodes
            .iter()
            .flat_map(|n| n.subscribe_topics(settings, &self.id))
            .collect()
    }

    /// Value messages for every property with a known value.
    #[must_use]
    pub fn value_messages(&self, settings: &HomieSettings) -> Vec<Message> {
        self.nodes
            .iter()
            .flat_map(|n| n.value_messages(settings, &self.id))
            .collect()
    }

    /// `$stats/*` messages for the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::NotReady`] unless the device is operational.
    pub fn stats_messages(&self, settings: &HomieSettings) -> Result<Vec<Message>, HomieError> {
        if !self.state.is_operational() {
            return Err(HomieError::NotReady { state: self.state });
        }
        Ok(self
            .stats
            .entries()
            .into_iter()
            .map(|(suffix, payload)| settings.message(self.id.as_str(), suffix, payload))
            .collect())
    }

    /// Split a `prefix/device/node/property/set` topic addressed to this
    /// device into `(node, property)`.
    #[must_use]
    pub fn parse_set_topic<'a>(
        &self,
        settings: &HomieSettings,
        topic: &'a str,
    ) -> Option<(&'a str, &'a str)> {
        let rest = topic
            .strip_prefix(settings.prefix.as_str())?
            .strip_prefix('/')?
            .strip_prefix(self.id.as_str())?
            .strip_prefix('/')?
            .strip_suffix("/set")?;
        let (node, property) = rest.split_once('/')?;
        if node.is_empty() || property.is_empty() || property.contains('/') {
            return None;
        }
        if node.starts_with('$') || property.starts_with('$') {
            return None;
        }
        Some((node, property))
    }

    fn node_mut(&mut self, node_id: &str) -> Result<&mut Node, NotFoundError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id() == node_id)
            .ok_or_else(|| NotFoundError {
                entity: "Node",
                id: node_id.to_string(),
            })
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<String>,
    name: Option<String>,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Publish `$fw/name` and `$fw/version`.
    #[must_use]
    pub fn firmware(self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.attribute("$fw/name", name).attribute("$fw/version", version)
    }

    /// Publish `$implementation`.
    #[must_use]
    pub fn implementation(self, implementation: impl Into<String>) -> Self {
        self.attribute("$implementation", implementation)
    }

    /// Publish an extra device attribute; a missing `$` is prepended.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let key = if key.starts_with('$') {
            key
        } else {
            format!("${key}")
        };
        self.attributes.push((key, value.into()));
        self
    }

    #[must_use]
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Consume the builder, validate, and return a [`Device`] in `init`.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Validation`] for a missing/invalid id or empty
    /// name, and [`HomieError::DuplicateId`] for clashing node ids.
    pub fn build(self) -> Result<Device, HomieError> {
        let id = DeviceId::new(self.id.ok_or(ValidationError::MissingField("id"))?)?;
        let name = self.name.unwrap_or_else(|| id.to_string());
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let mut device = Device {
            id,
            name,
            attributes: self.attributes,
            state: DeviceState::Init,
            announced: false,
            nodes: Vec::with_capacity(self.nodes.len()),
            stats: Stats::default(),
        };
        for node in self.nodes {
            device.attach_node(node)?;
        }
        Ok(device)
    }
}
