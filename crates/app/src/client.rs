//! Homie client: the device lifecycle bound to a [`Transport`].
//!
//! The client never owns the device. The device loop passes it in by
//! `&mut` for every operation, so all state mutation stays on that loop.
//! Every state or value change follows publish-then-commit: the message is
//! submitted first and the local model only changes once the submission was
//! accepted.

use homie_domain::device::Device;
use homie_domain::error::HomieError;
use homie_domain::id::{DeviceId, NodeId, PropertyId};
use homie_domain::message::Message;
use homie_domain::settings::HomieSettings;
use homie_domain::state::DeviceState;
use homie_domain::stats::Stats;
use homie_domain::value::PropertyValue;

use crate::diagnostics::LogForwarder;
use crate::ports::Transport;

/// What an inbound publish turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A `/set` payload was accepted and committed.
    Set {
        node_id: NodeId,
        property_id: PropertyId,
        value: PropertyValue,
    },
    /// A `$broadcast/<level>` message.
    Broadcast { level: String, payload: String },
    /// Not addressed to this device.
    Ignored,
}

/// Facade driving a [`Device`] over a [`Transport`].
#[derive(Debug)]
pub struct HomieClient<T> {
    transport: T,
    settings: HomieSettings,
    birth: Option<Message>,
    shutdown: Option<Message>,
}

impl<T: Transport> HomieClient<T> {
    /// Create a client publishing with `settings`.
    pub fn new(transport: T, settings: HomieSettings) -> Self {
        Self {
            transport,
            settings,
            birth: None,
            shutdown: None,
        }
    }

    /// Publish `message` on every connect, before the announce.
    #[must_use]
    pub fn with_birth_message(mut self, message: Message) -> Self {
        self.birth = Some(message);
        self
    }

    /// Publish `message` on graceful shutdown, after `$state=disconnected`.
    #[must_use]
    pub fn with_shutdown_message(mut self, message: Message) -> Self {
        self.shutdown = Some(message);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &HomieSettings {
        &self.settings
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access, e.g. to open the session once the will is armed.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Arm `$state=lost` (retained) as the MQTT last will.
    ///
    /// Must run before the transport connects.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the transport no longer accepts
    /// a will.
    #[tracing::instrument(skip(self))]
    pub fn configure_last_will(&mut self, device_id: &DeviceId) -> Result<(), HomieError> {
        let will = Message::build(
            &self.settings.prefix,
            device_id.as_str(),
            "$state",
            DeviceState::Lost.as_str(),
            self.settings.qos,
            true,
        );
        self.transport.set_last_will(will)
    }

    /// Run the full announce sequence and bring the device to `ready`.
    ///
    /// Submission order: birth message, `$state=init`, `$homie`, `$name`,
    /// device attributes, `$nodes`, node and property metadata, `/set` (and
    /// broadcast) subscriptions, `$state=ready`. Known values are replayed
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when any submission fails. The
    /// device is then left in `init` and the whole sequence must be retried.
    #[tracing::instrument(skip_all, fields(device = %device.id()))]
    pub fn start_homie(&self, device: &mut Device) -> Result<(), HomieError> {
        if let Err(err) = self.announce(device) {
            if device.state() != DeviceState::Init {
                device.set_state(DeviceState::Init)?;
            }
            return Err(err);
        }
        tracing::info!(nodes = device.nodes().len(), "device ready");

        for message in device.value_messages(&self.settings) {
            if let Err(err) = self.transport.publish(&message) {
                tracing::warn!(%err, topic = %message.topic, "value replay failed");
            }
        }
        Ok(())
    }

    /// Number of transport submissions [`start_homie`](Self::start_homie)
    /// makes for `device`, value replay included.
    ///
    /// Lets a transport with a bounded request queue be sized so the whole
    /// announce fits in it.
    #[must_use]
    pub fn announce_size(&self, device: &Device) -> usize {
        let birth = usize::from(self.birth.is_some());
        let broadcast = usize::from(self.settings.broadcast);
        // $state=init and $state=ready
        birth
            + 2
            + device.declare_metadata(&self.settings).len()
            + device.subscribe_topics(&self.settings).len()
            + broadcast
            + device.value_messages(&self.settings).len()
    }

    fn announce(&self, device: &mut Device) -> Result<(), HomieError> {
        if let Some(birth) = &self.birth {
            self.transport.publish(birth)?;
        }

        self.transport
            .publish(&device.state_message(&self.settings, DeviceState::Init))?;
        device.set_state(DeviceState::Init)?;

        for message in device.declare_metadata(&self.settings) {
            self.transport.publish(&message)?;
        }
        for (topic, qos) in device.subscribe_topics(&self.settings) {
            self.transport.subscribe(&topic, qos)?;
        }
        if self.settings.broadcast {
            self.transport
                .subscribe(&self.settings.broadcast_filter(), self.settings.qos)?;
        }

        self.transport
            .publish(&device.state_message(&self.settings, DeviceState::Ready))?;
        device.set_state(DeviceState::Ready)
    }

    /// Publish a locally produced value, then commit it.
    ///
    /// # Errors
    ///
    /// - [`HomieError::NotReady`] unless the device is `ready` or `alert`
    /// - [`HomieError::NotFound`] for an unknown node or property
    /// - [`HomieError::TypeMismatch`] when `value` does not fit the property
    /// - [`HomieError::Transport`] when the publish was not submitted
    ///
    /// The current value is unchanged in every error case.
    #[tracing::instrument(skip(self, device, value))]
    pub fn publish_value(
        &self,
        device: &mut Device,
        node_id: &str,
        property_id: &str,
        value: PropertyValue,
    ) -> Result<(), HomieError> {
        let state = device.state();
        if !state.is_operational() {
            return Err(HomieError::NotReady { state });
        }
        let (device_id, node, property) = device.property_mut(node_id, property_id)?;
        let message = property.value_message(&self.settings, device_id, node, &value)?;
        self.transport.publish(&message)?;
        property.commit_value(value)?;
        Ok(())
    }

    /// Route one inbound publish.
    ///
    /// Accepted `/set` payloads are committed and the property callback runs;
    /// nothing is republished.
    ///
    /// # Errors
    ///
    /// - [`HomieError::NotFound`] for an unknown or read-only property
    /// - [`HomieError::InvalidPayload`] when the payload does not decode; the
    ///   current value is left untouched
    pub fn handle_message(
        &self,
        device: &mut Device,
        topic: &str,
        payload: &str,
    ) -> Result<Inbound, HomieError> {
        if self.settings.broadcast
            && let Some(level) = self.settings.broadcast_level(topic)
        {
            return Ok(Inbound::Broadcast {
                level: level.to_string(),
                payload: payload.to_string(),
            });
        }
        let Some((node_id, property_id)) = device.parse_set_topic(&self.settings, topic) else {
            tracing::trace!(topic, "ignoring foreign topic");
            return Ok(Inbound::Ignored);
        };
        let (_, node, property) = device.property_mut(node_id, property_id)?;
        let value = property.handle_incoming(payload)?.clone();
        tracing::debug!(%node, property = %property.id(), %value, "set accepted");
        Ok(Inbound::Set {
            node_id: node.clone(),
            property_id: property.id().clone(),
            value,
        })
    }

    /// Record `stats` and publish the `$stats/*` topics.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::NotReady`] unless the device is operational (the
    /// snapshot is still recorded) or [`HomieError::Transport`] on a failed
    /// submission.
    pub fn publish_stats(&self, device: &mut Device, stats: Stats) -> Result<(), HomieError> {
        device.record_stats(stats);
        for message in device.stats_messages(&self.settings)? {
            self.transport.publish(&message)?;
        }
        Ok(())
    }

    /// Publish `$state=<state>`, then commit it.
    ///
    /// Used for the health-driven `alert`/`sleeping` transitions and their
    /// way back to `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::InvalidTransition`] before anything is
    /// published when the lifecycle forbids the move, or
    /// [`HomieError::Transport`] on a failed submission.
    #[tracing::instrument(skip(self, device), fields(device = %device.id()))]
    pub fn set_device_state(
        &self,
        device: &mut Device,
        state: DeviceState,
    ) -> Result<(), HomieError> {
        let from = device.state();
        if !from.can_transition_to(state) {
            return Err(HomieError::InvalidTransition { from, to: state });
        }
        self.transport
            .publish(&device.state_message(&self.settings, state))?;
        device.set_state(state)?;
        tracing::info!(%from, to = %state, "state changed");
        Ok(())
    }

    /// Follow the application health signal: a fault moves a `ready` device
    /// to `alert`, recovery moves it back. Other states are left alone, so
    /// the signal is re-applied once a (re)announce reached `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the state publish fails; the
    /// device keeps its state and the next call retries.
    pub fn apply_health(&self, device: &mut Device, faulted: bool) -> Result<(), HomieError> {
        let target = match (device.state(), faulted) {
            (DeviceState::Ready, true) => DeviceState::Alert,
            (DeviceState::Alert, false) => DeviceState::Ready,
            _ => return Ok(()),
        };
        self.set_device_state(device, target)
    }

    /// The session dropped: the broker announces `lost` on our behalf and
    /// the next connect must replay the announce from `init`.
    pub fn on_disconnected(&self, device: &mut Device) {
        tracing::warn!(device = %device.id(), state = %device.state(), "transport disconnected");
        if let Err(err) = device.set_state(DeviceState::Init) {
            tracing::error!(%err, "failed to reset device state");
        }
    }

    /// Graceful shutdown: `$state=disconnected`, the optional shutdown
    /// message, then a clean transport disconnect.
    ///
    /// The state publish is best-effort; a failure is logged and the
    /// disconnect still happens.
    ///
    /// # Errors
    ///
    /// Returns [`HomieError::Transport`] when the disconnect itself cannot be
    /// submitted.
    #[tracing::instrument(skip_all, fields(device = %device.id()))]
    pub fn shutdown(&self, device: &mut Device) -> Result<(), HomieError> {
        let message = device.state_message(&self.settings, DeviceState::Disconnected);
        match self.transport.publish(&message) {
            Ok(()) => device.set_state(DeviceState::Disconnected)?,
            Err(err) => tracing::warn!(%err, "could not announce disconnected state"),
        }
        if let Some(shutdown) = &self.shutdown
            && let Err(err) = self.transport.publish(shutdown)
        {
            tracing::warn!(%err, "could not publish shutdown message");
        }
        self.transport.disconnect()
    }
}

impl<T: Transport + Clone> HomieClient<T> {
    /// Build a [`LogForwarder`] republishing events at or above `level` to
    /// `<device>/$log`. Install it as a `tracing_subscriber` layer.
    #[must_use]
    pub fn setup_logging(&self, device_id: &DeviceId, level: tracing::Level) -> LogForwarder<T> {
        LogForwarder::new(self.transport.clone(), &self.settings, device_id, level)
    }
}
