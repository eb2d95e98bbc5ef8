//! Property: a typed, optionally settable leaf attribute of a node.

use std::fmt;

use crate::datatype::DataType;
use crate::error::{HomieError, NotFoundError, TypeMismatchError, ValidationError};
use crate::id::{DeviceId, NodeId, PropertyId};
use crate::message::{Message, QoS};
use crate::settings::HomieSettings;
use crate::value::PropertyValue;

/// Callback invoked with every value accepted from a `/set` message.
pub type SetCallback = Box<dyn FnMut(&PropertyValue) + Send>;

/// A single typed, addressable attribute of a node.
pub struct Property {
    id: PropertyId,
    name: String,
    datatype: DataType,
    unit: Option<String>,
    format: Option<String>,
    settable: bool,
    retained: Option<bool>,
    qos: Option<QoS>,
    value: Option<PropertyValue>,
    on_set: Option<SetCallback>,
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("datatype", &self.datatype)
            .field("unit", &self.unit)
            .field("format", &self.format)
            .field("settable", &self.settable)
            .field("retained", &self.retained)
            .field("qos", &self.qos)
            .field("value", &self.value)
            .field("on_set", &self.on_set.is_some())
            .finish()
    }
}

impl Property {
    /// Create a builder for constructing a [`Property`].
    #[must_use]
    pub fn builder() -> PropertyBuilder {
        PropertyBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> &PropertyId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    #[must_use]
    pub fn is_settable(&self) -> bool {
        self.settable
    }

    /// Last value that was published or accepted.
    #[must_use]
    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }

    /// Register (or replace) the callback fired on accepted `/set` values.
    pub fn on_set(&mut self, callback: impl FnMut(&PropertyValue) + Send + 'static) {
        self.on_set = Some(Box::new(callback));
    }

    /// Metadata messages under `<node>/<property>/`.
    ///
    /// `$unit`, `$format` and `$settable` only appear when applicable;
    /// `$retained` only when the property opts out of retention.
    #[must_use]
    pub fn declare_metadata(
        &self,
        settings: &HomieSettings,
        device_id: &DeviceId,
        node_id: &NodeId,
    ) -> Vec<Message> {
        let base = format!("{node_id}/{}", self.id);
        let attr = |name: &str, payload: &str| {
            settings.message(device_id.as_str(), &format!("{base}/{name}"), payload)
        };

        let mut messages = vec![
            attr("$name", &self.name),
            attr("$datatype", self.datatype.as_str()),
        ];
        if let Some(unit) = &self.unit {
            messages.push(attr("$unit", unit));
        }
        if let Some(format) = &self.format {
            messages.push(attr("$format", format));
        }
        if self.settable {
            messages.push(attr("$settable", "true"));
        }
        if !self.is_retained(settings) {
            messages.push(attr("$retained", "false"));
        }
        messages
    }

    /// Suffix of the `/set` topic, relative to the device.
    #[must_use]
    pub fn set_suffix(&self, node_id: &NodeId) -> String {
        format!("{node_id}/{}/set", self.id)
    }

    /// Build the value message for `value` without committing it.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatchError`] when `value` does not fit the declared
    /// datatype or format.
    pub fn value_message(
        &self,
        settings: &HomieSettings,
        device_id: &DeviceId,
        node_id: &NodeId,
        value: &PropertyValue,
    ) -> Result<Message, TypeMismatchError> {
        let payload = value.encode_checked(self.datatype, self.format.as_deref())?;
        Ok(Message::build(
            &settings.prefix,
            device_id.as_str(),
            &format!("{node_id}/{}", self.id),
            payload,
            self.qos.unwrap_or(settings.qos),
            self.is_retained(settings),
        ))
    }

    /// Value message for the current value, if there is one.
    #[must_use]
    pub fn current_value_message(
        &self,
        settings: &HomieSettings,
        device_id: &DeviceId,
        node_id: &NodeId,
    ) -> Option<Message> {
        let value = self.value.as_ref()?;
        self.value_message(settings, device_id, node_id, value).ok()
    }

    /// Record `value` as the current value once its publish was submitted.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatchError`] when `value` does not fit the declaration.
    pub fn commit_value(&mut self, value: PropertyValue) -> Result<(), TypeMismatchError> {
        value.encode_checked(self.datatype, self.format.as_deref())?;
        self.value = Some(value);
        Ok(())
    }

    /// Decode an inbound `/set` payload, commit it and notify the callback.
    ///
    /// Nothing is republished; the owner decides how to reflect the value.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::NotFound`] for read-only properties and
    /// [`HomieError::InvalidPayload`] when decoding fails. In both cases the
    /// current value is left untouched.
    pub fn handle_incoming(&mut self, payload: &str) -> Result<&PropertyValue, HomieError> {
        if !self.settable {
            return Err(NotFoundError {
                entity: "Settable property",
                id: self.id.to_string(),
            }
            .into());
        }
        let value = PropertyValue::decode(self.datatype, self.format.as_deref(), payload)?;
        if let Some(callback) = self.on_set.as_mut() {
            callback(&value);
        }
        Ok(self.value.insert(value))
    }

    fn is_retained(&self, settings: &HomieSettings) -> bool {
        self.retained.unwrap_or(settings.retained)
    }
}

/// Step-by-step builder for [`Property`].
#[derive(Default)]
pub struct PropertyBuilder {
    id: Option<String>,
    name: Option<String>,
    datatype: DataType,
    unit: Option<String>,
    format: Option<String>,
    settable: bool,
    retained: Option<bool>,
    qos: Option<QoS>,
    value: Option<PropertyValue>,
    on_set: Option<SetCallback>,
}

impl PropertyBuilder {
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
    pub fn datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn settable(mut self, settable: bool) -> Self {
        self.settable = settable;
        self
    }

    /// Override the session-wide retain flag for value publishes.
    #[must_use]
    pub fn retained(mut self, retained: bool) -> Self {
        self.retained = Some(retained);
        self
    }

    /// Override the session-wide QoS for value publishes.
    #[must_use]
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = Some(qos);
        self
    }

    /// Initial value, replayed after the device becomes ready.
    #[must_use]
    pub fn value(mut self, value: PropertyValue) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn on_set(mut self, callback: impl FnMut(&PropertyValue) + Send + 'static) -> Self {
        self.on_set = Some(Box::new(callback));
        self
    }

    /// Consume the builder, validate, and return a [`Property`].
    ///
    /// The name defaults to the id.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Validation`] for a missing or invalid id or an
    /// unusable format, and [`HomieError::TypeMismatch`] when the initial
    /// value does not fit the declaration.
    pub fn build(self) -> Result<Property, HomieError> {
        let id = PropertyId::new(self.id.ok_or(ValidationError::MissingField("id"))?)?;
        self.datatype.validate_format(self.format.as_deref())?;
        if let Some(value) = &self.value {
            value.encode_checked(self.datatype, self.format.as_deref())?;
        }
        Ok(Property {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            datatype: self.datatype,
            unit: self.unit,
            format: self.format,
            settable: self.settable,
            retained: self.retained,
            qos: self.qos,
            value: self.value,
            on_set: self.on_set,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn ids() -> (DeviceId, NodeId) {
        (
            DeviceId::new("kitchen-light").unwrap(),
            NodeId::new("light").unwrap(),
        )
    }

    fn power() -> Property {
        Property::builder()
            .id("power")
            .name("Power")
            .datatype(DataType::Boolean)
            .settable(true)
            .build()
            .unwrap()
    }

    #[test]
    fn should_require_an_id() {
        let result = Property::builder().datatype(DataType::Boolean).build();
        assert!(matches!(
            result,
            Err(HomieError::Validation(ValidationError::MissingField("id")))
        ));
    }

    #[test]
    fn should_default_name_to_id() {
        let property = Property::builder().id("temperature").build().unwrap();
        assert_eq!(property.name(), "temperature");
    }

    #[test]
    fn should_reject_enum_without_format() {
        let result = Property::builder()
            .id("mode")
            .datatype(DataType::Enum)
            .build();
        assert!(matches!(
            result,
            Err(HomieError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[test]
    fn should_reject_initial_value_of_wrong_type() {
        let result = Property::builder()
            .id("power")
            .datatype(DataType::Boolean)
            .value(PropertyValue::Integer(1))
            .build();
        assert!(matches!(result, Err(HomieError::TypeMismatch(_))));
    }

    #[test]
    fn should_declare_settable_boolean_metadata() {
        let (device, node) = ids();
        let topics: Vec<String> = power()
            .declare_metadata(&HomieSettings::default(), &device, &node)
            .into_iter()
            .map(|m| m.to_string())
            .collect();
        assert_eq!(
            topics,
            vec![
                "homie/kitchen-light/light/power/$name=Power",
                "homie/kitchen-light/light/power/$datatype=boolean",
                "homie/kitchen-light/light/power/$settable=true",
            ]
        );
    }

    #[test]
    fn should_declare_unit_format_and_retained_when_present() {
        let (device, node) = ids();
        let property = Property::builder()
            .id("brightness")
            .datatype(DataType::Integer)
            .unit("%")
            .format("0:100")
            .retained(false)
            .build()
            .unwrap();
        let messages = property.declare_metadata(&HomieSettings::default(), &device, &node);
        let suffixes: Vec<&str> = messages
            .iter()
            .map(|m| m.topic.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(
            suffixes,
            vec!["$name", "$datatype", "$unit", "$format", "$retained"]
        );
        assert!(messages.iter().all(|m| m.retain));
    }

    #[test]
    fn should_build_value_message_with_overrides() {
        let (device, node) = ids();
        let property = Property::builder()
            .id("power")
            .datatype(DataType::Boolean)
            .qos(QoS::AtMostOnce)
            .retained(false)
            .build()
            .unwrap();
        let msg = property
            .value_message(
                &HomieSettings::default(),
                &device,
                &node,
                &PropertyValue::Boolean(true),
            )
            .unwrap();
        assert_eq!(msg.topic, "homie/kitchen-light/light/power");
        assert_eq!(msg.payload, "true");
        assert_eq!(msg.qos, QoS::AtMostOnce);
        assert!(!msg.retain);
    }

    #[test]
    fn should_not_commit_when_building_value_message() {
        let (device, node) = ids();
        let property = power();
        property
            .value_message(
                &HomieSettings::default(),
                &device,
                &node,
                &PropertyValue::Boolean(true),
            )
            .unwrap();
        assert!(property.value().is_none());
    }

    #[test]
    fn should_accept_valid_set_payload_and_notify_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        let mut property = power();
        property.on_set(move |value| seen.lock().unwrap().push(value.clone()));

        let value = property.handle_incoming("true").unwrap().clone();

        assert_eq!(value, PropertyValue::Boolean(true));
        assert_eq!(property.value(), Some(&PropertyValue::Boolean(true)));
        assert_eq!(*calls.lock().unwrap(), vec![PropertyValue::Boolean(true)]);
    }

    #[test]
    fn should_leave_value_untouched_on_invalid_payload() {
        let calls = Arc::new(Mutex::new(0));
        let seen = Arc::clone(&calls);
        let mut property = power();
        property.commit_value(PropertyValue::Boolean(false)).unwrap();
        property.on_set(move |_| *seen.lock().unwrap() += 1);

        let result = property.handle_incoming("not-a-bool");

        assert!(matches!(result, Err(HomieError::InvalidPayload(_))));
        assert_eq!(property.value(), Some(&PropertyValue::Boolean(false)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn should_refuse_set_on_read_only_property() {
        let mut property = Property::builder()
            .id("temperature")
            .datatype(DataType::Float)
            .build()
            .unwrap();
        let result = property.handle_incoming("21.5");
        assert!(matches!(result, Err(HomieError::NotFound(_))));
        assert!(property.value().is_none());
    }

    #[test]
    fn should_build_set_suffix() {
        let (_, node) = ids();
        assert_eq!(power().set_suffix(&node), "light/power/set");
    }
}
