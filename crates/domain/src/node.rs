//! Node: a logical sub-unit of a device owning an ordered set of properties.

use crate::error::{DuplicateIdError, HomieError, ValidationError};
use crate::id::{DeviceId, NodeId};
use crate::message::{Message, QoS};
use crate::property::Property;
use crate::settings::HomieSettings;

/// A named collection of properties, e.g. one switch or one sensor channel.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    node_type: String,
    attributes: Vec<(String, String)>,
    properties: Vec<Property>,
}

impl Node {
    /// Create a builder for constructing a [`Node`].
    #[must_use]
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Extra `$`-attributes published after `$properties`.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Properties in insertion order.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id() == id)
    }

    pub fn property_mut(&mut self, id: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.id() == id)
    }

    /// Borrow the node id alongside a mutable property.
    pub(crate) fn split_property_mut(&mut self, id: &str) -> Option<(&NodeId, &mut Property)> {
        let Self {
            id: node_id,
            properties,
            ..
        } = self;
        properties
            .iter_mut()
            .find(|p| p.id() == id)
            .map(|p| (&*node_id, p))
    }

    /// Append a property, keeping call order.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateIdError`] when a property with the same id exists;
    /// the node is left unchanged.
    pub fn attach_property(&mut self, property: Property) -> Result<(), DuplicateIdError> {
        if self.property(property.id().as_str()).is_some() {
            return Err(DuplicateIdError {
                entity: "Property",
                id: property.id().to_string(),
            });
        }
        self.properties.push(property);
        Ok(())
    }

    /// Comma-joined property ids, published as `$properties`.
    #[must_use]
    pub fn property_list(&self) -> String {
        self.properties
            .iter()
            .map(|p| p.id().as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `$name`, `$type`, `$properties`, extra attributes, then every
    /// property's metadata.
    #[must_use]
    pub fn declare_metadata(&self, settings: &HomieSettings, device_id: &DeviceId) -> Vec<Message> {
        let attr = |name: &str, payload: &str| {
            settings.message(device_id.as_str(), &format!("{}/{name}", self.id), payload)
        };
        let mut messages = vec![
            attr("$name", &self.name),
            attr("$type", &self.node_type),
            attr("$properties", &self.property_list()),
        ];
        for (key, value) in &self.attributes {
            messages.push(attr(key, value));
        }
        for property in &self.properties {
            messages.extend(property.declare_metadata(settings, device_id, &self.id));
        }
        messages
    }

    /// One `(topic, qos)` subscription per settable property.
    #[must_use]
    pub fn subscribe_topics(
        &self,
        settings: &HomieSettings,
        device_id: &DeviceId,
    ) -> Vec<(String, QoS)> {
        self.properties
            .iter()
            .filter(|p| p.is_settable())
            .map(|p| {
                let suffix = p.set_suffix(&self.id);
                (
                    format!("{}/{device_id}/{suffix}", settings.prefix),
                    settings.qos,
                )
            })
            .collect()
    }

    /// Retained value messages for every property holding a value.
    #[must_use]
    pub fn value_messages(&self, settings: &HomieSettings, device_id: &DeviceId) -> Vec<Message> {
        self.properties
            .iter()
            .filter_map(|p| p.current_value_message(settings, device_id, &self.id))
            .collect()
    }
}

/// Step-by-step builder for [`Node`].
#[derive(Debug, Default)]
pub struct NodeBuilder {
    id: Option<String>,
    name: Option<String>,
    node_type: Option<String>,
    attributes: Vec<(String, String)>,
    properties: Vec<Property>,
}

impl NodeBuilder {
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

    #[must_use]
    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    /// Publish an extra node attribute; a missing `$` is prepended.
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
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Consume the builder, validate, and return a [`Node`].
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Validation`] for a missing or invalid id or an
    /// empty name, and [`HomieError::DuplicateId`] when two properties share
    /// an id.
    pub fn build(self) -> Result<Node, HomieError> {
        let id = NodeId::new(self.id.ok_or(ValidationError::MissingField("id"))?)?;
        let name = self.name.unwrap_or_else(|| id.to_string());
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let mut node = Node {
            id,
            name,
            node_type: self.node_type.unwrap_or_default(),
            attributes: self.attributes,
            properties: Vec::with_capacity(self.properties.len()),
        };
        for property in self.properties {
            node.attach_property(property)?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::value::PropertyValue;

    fn device_id() -> DeviceId {
        DeviceId::new("kitchen-light").unwrap()
    }

    fn prop(id: &str, settable: bool) -> Property {
        Property::builder()
            .id(id)
            .datatype(DataType::Boolean)
            .settable(settable)
            .build()
            .unwrap()
    }

    fn light() -> Node {
        Node::builder()
            .id("light")
            .name("Light")
            .node_type("light")
            .property(prop("power", true))
            .property(prop("overheated", false))
            .build()
            .unwrap()
    }

    #[test]
    fn should_keep_property_insertion_order() {
        assert_eq!(light().property_list(), "power,overheated");
    }

    #[test]
    fn should_reject_duplicate_property_and_keep_node_unchanged() {
        let mut node = light();
        let err = node.attach_property(prop("power", false)).unwrap_err();
        assert_eq!(err.id, "power");
        assert_eq!(node.properties().len(), 2);
        assert!(node.property("power").unwrap().is_settable());
    }

    #[test]
    fn should_reject_duplicate_property_in_builder() {
        let result = Node::builder()
            .id("light")
            .property(prop("power", true))
            .property(prop("power", true))
            .build();
        assert!(matches!(result, Err(HomieError::DuplicateId(_))));
    }

    #[test]
    fn should_reject_invalid_node_id() {
        let result = Node::builder().id("Light").build();
        assert!(matches!(
            result,
            Err(HomieError::Validation(ValidationError::InvalidId { .. }))
        ));
    }

    #[test]
    fn should_declare_node_attributes_before_property_metadata() {
        let messages = light().declare_metadata(&HomieSettings::default(), &device_id());
        let rendered: Vec<String> = messages.iter().take(4).map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "homie/kitchen-light/light/$name=Light",
                "homie/kitchen-light/light/$type=light",
                "homie/kitchen-light/light/$properties=power,overheated",
                "homie/kitchen-light/light/power/$name=power",
            ]
        );
    }

    #[test]
    fn should_declare_extra_attributes_after_property_list() {
        let node = Node::builder()
            .id("light")
            .name("Light")
            .attribute("array", "0-3")
            .attribute("$location", "kitchen")
            .property(prop("power", true))
            .build()
            .unwrap();

        let rendered: Vec<String> = node
            .declare_metadata(&HomieSettings::default(), &device_id())
            .iter()
            .take(6)
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            rendered[2..].to_vec(),
            vec![
                "homie/kitchen-light/light/$properties=power",
                "homie/kitchen-light/light/$array=0-3",
                "homie/kitchen-light/light/$location=kitchen",
                "homie/kitchen-light/light/power/$name=power",
            ]
        );
    }

    #[test]
    fn should_subscribe_only_settable_properties() {
        let topics = light().subscribe_topics(&HomieSettings::default(), &device_id());
        assert_eq!(
            topics,
            vec![(
                "homie/kitchen-light/light/power/set".to_string(),
                QoS::AtLeastOnce
            )]
        );
    }

    #[test]
    fn should_emit_value_messages_for_known_values_only() {
        let mut node = light();
        node.property_mut("power")
            .unwrap()
            .commit_value(PropertyValue::Boolean(true))
            .unwrap();
        let messages = node.value_messages(&HomieSettings::default(), &device_id());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to_string(), "homie/kitchen-light/light/power=true");
    }
}
