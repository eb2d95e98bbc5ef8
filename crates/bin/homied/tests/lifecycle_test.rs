//! End-to-end lifecycle tests for the full homied stack.
//!
//! Each test wires the real client, registry, assembly and virtual
//! components against an in-memory broker that keeps retained messages and
//! honours the last will. No network socket is opened.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use homie_adapter_virtual::{ComponentConfig, VirtualComponent, VirtualIntegration};
use homie_app::assembly::assemble;
use homie_app::client::{HomieClient, Inbound};
use homie_app::ports::{Component, PropertyUpdate, Transport};
use homie_app::registry::Registry;
use homie_domain::device::Device;
use homie_domain::error::HomieError;
use homie_domain::id::DeviceId;
use homie_domain::message::{Message, QoS};
use homie_domain::settings::HomieSettings;
use homie_domain::state::DeviceState;
use homie_domain::stats::Stats;
use homie_domain::value::PropertyValue;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// In-memory broker
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BrokerState {
    online: bool,
    will: Option<Message>,
    will_armed: bool,
    retained: BTreeMap<String, String>,
    subscriptions: Vec<String>,
    delivered: Vec<String>,
}

impl BrokerState {
    fn deliver(&mut self, message: &Message) {
        if message.retain {
            if message.payload.is_empty() {
                self.retained.remove(&message.topic);
            } else {
                self.retained
                    .insert(message.topic.clone(), message.payload.clone());
            }
        }
        self.delivered.push(message.to_string());
    }
}

#[derive(Debug, Clone, Default)]
struct Broker(Arc<Mutex<BrokerState>>);

impl Broker {
    fn state(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        self.0.lock().unwrap()
    }

    fn connect(&self) {
        let mut state = self.state();
        state.online = true;
        state.will_armed = state.will.is_some();
    }

    /// Connection lost without a DISCONNECT: the broker fires the will.
    fn drop_connection(&self) {
        let mut state = self.state();
        state.online = false;
        if std::mem::take(&mut state.will_armed)
            && let Some(will) = state.will.clone()
        {
            state.deliver(&will);
        }
    }

    fn retained(&self, topic: &str) -> Option<String> {
        self.state().retained.get(topic).cloned()
    }

    fn delivered(&self) -> Vec<String> {
        self.state().delivered.clone()
    }

    fn offline() -> HomieError {
        HomieError::Transport(Box::new(io::Error::new(
            io::ErrorKind::NotConnected,
            "broker offline",
        )))
    }
}

impl Transport for Broker {
    fn set_last_will(&mut self, will: Message) -> Result<(), HomieError> {
        self.state().will = Some(will);
        Ok(())
    }

    fn publish(&self, message: &Message) -> Result<(), HomieError> {
        let mut state = self.state();
        if !state.online {
            return Err(Self::offline());
        }
        state.deliver(message);
        Ok(())
    }

    fn subscribe(&self, topic: &str, _qos: QoS) -> Result<(), HomieError> {
        let mut state = self.state();
        if !state.online {
            return Err(Self::offline());
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn disconnect(&self) -> Result<(), HomieError> {
        let mut state = self.state();
        state.online = false;
        state.will_armed = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

struct Harness {
    broker: Broker,
    client: HomieClient<Broker>,
    device: Device,
    integration: VirtualIntegration,
    updates: mpsc::UnboundedReceiver<PropertyUpdate>,
}

impl Harness {
    fn kitchen_light() -> Self {
        let broker = Broker::default();
        let mut client = HomieClient::new(broker.clone(), HomieSettings::default());
        client
            .configure_last_will(&DeviceId::new("kitchen-light").unwrap())
            .unwrap();

        let integration = VirtualIntegration::from_config(&[ComponentConfig::Light {
            name: "Kitchen".to_string(),
            node_id: Some("light".to_string()),
            power: false,
            brightness: 100,
            color: [255, 255, 255],
        }]);
        let mut registry = Registry::new();
        homie_adapter_virtual::register_node_classes(&mut registry).unwrap();
        let mut device = Device::builder()
            .id("kitchen-light")
            .name("Kitchen Light")
            .build()
            .unwrap();
        let (tx, updates) = mpsc::unbounded_channel();
        assemble(&mut device, &mut registry, integration.components(), &tx).unwrap();

        Self {
            broker,
            client,
            device,
            integration,
            updates,
        }
    }

    fn connect_and_announce(&mut self) {
        self.broker.connect();
        self.client.start_homie(&mut self.device).unwrap();
    }

    fn set(&mut self, topic: &str, payload: &str) -> Result<Inbound, HomieError> {
        self.client.handle_message(&mut self.device, topic, payload)
    }

    /// Publish every queued component update, like the daemon loop does.
    async fn flush_updates(&mut self) {
        while let Ok(Some(update)) =
            tokio::time::timeout(Duration::from_millis(10), self.updates.recv()).await
        {
            self.client
                .publish_value(
                    &mut self.device,
                    update.node_id.as_str(),
                    &update.property_id,
                    update.value,
                )
                .unwrap();
        }
    }

    /// Follow component health, like the daemon loop does after each event.
    fn follow_health(&mut self) {
        let faulted = self.integration.components().any(Component::is_faulted);
        self.client
            .apply_health(&mut self.device, faulted)
            .unwrap();
    }

    fn set_light_fault(&self, faulted: bool) {
        self.integration
            .get("Kitchen")
            .expect("kitchen light")
            .set_fault(faulted);
    }

    fn light_power(&self) -> bool {
        match self.integration.get("Kitchen") {
            Some(VirtualComponent::Light(light)) => light.state().power,
            other => panic!("expected the kitchen light, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Announce
// ---------------------------------------------------------------------------

#[test]
fn should_leave_retained_description_after_announce() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    let broker = &harness.broker;
    assert_eq!(broker.retained("homie/kitchen-light/$homie").as_deref(), Some("4.0.0"));
    assert_eq!(broker.retained("homie/kitchen-light/$name").as_deref(), Some("Kitchen Light"));
    assert_eq!(broker.retained("homie/kitchen-light/$nodes").as_deref(), Some("light"));
    assert_eq!(
        broker.retained("homie/kitchen-light/light/$properties").as_deref(),
        Some("power,brightness,color")
    );
    assert_eq!(
        broker.retained("homie/kitchen-light/light/brightness/$format").as_deref(),
        Some("0:100")
    );
    assert_eq!(broker.retained("homie/kitchen-light/$state").as_deref(), Some("ready"));
    assert_eq!(
        broker.retained("homie/kitchen-light/light/power").as_deref(),
        Some("false")
    );
    assert_eq!(
        broker.state().subscriptions,
        vec![
            "homie/kitchen-light/light/power/set",
            "homie/kitchen-light/light/brightness/set",
            "homie/kitchen-light/light/color/set",
        ]
    );
}

#[test]
fn should_publish_init_first_and_ready_after_metadata() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    let delivered = harness.broker.delivered();
    assert_eq!(delivered[0], "homie/kitchen-light/$state=init");
    let ready = delivered
        .iter()
        .position(|m| m == "homie/kitchen-light/$state=ready")
        .unwrap();
    let last_meta = delivered
        .iter()
        .rposition(|m| m.contains("/$") && !m.contains("/$state="))
        .unwrap();
    assert!(last_meta < ready);
    assert!(harness.device.is_announced());
}

#[test]
fn should_fail_announce_while_offline_and_stay_in_init() {
    let mut harness = Harness::kitchen_light();

    let err = harness.client.start_homie(&mut harness.device).unwrap_err();

    assert!(matches!(err, HomieError::Transport(_)));
    assert_eq!(harness.device.state(), DeviceState::Init);
    assert!(harness.broker.delivered().is_empty());
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_apply_set_and_mirror_new_value() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    let inbound = harness
        .set("homie/kitchen-light/light/power/set", "true")
        .unwrap();
    harness.flush_updates().await;

    assert!(matches!(inbound, Inbound::Set { value: PropertyValue::Boolean(true), .. }));
    assert!(harness.light_power());
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/light/power").as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn should_drop_malformed_boolean_and_keep_value() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    let err = harness
        .set("homie/kitchen-light/light/power/set", "yes")
        .unwrap_err();
    harness.flush_updates().await;

    assert!(matches!(err, HomieError::InvalidPayload(_)));
    assert!(!harness.light_power());
    assert_eq!(
        harness.device.node("light").unwrap().property("power").unwrap().value(),
        Some(&PropertyValue::Boolean(false))
    );
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/light/power").as_deref(),
        Some("false")
    );
}

#[test]
fn should_ignore_foreign_topics() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    let inbound = harness
        .set("homie/other-device/light/power/set", "true")
        .unwrap();

    assert_eq!(inbound, Inbound::Ignored);
    assert!(!harness.light_power());
}

#[tokio::test]
async fn should_publish_local_changes_once_ready() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    if let Some(VirtualComponent::Light(light)) = harness.integration.get("Kitchen") {
        light.set_brightness(40);
    }
    harness.flush_updates().await;

    assert_eq!(
        harness.broker.retained("homie/kitchen-light/light/brightness").as_deref(),
        Some("40")
    );
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[test]
fn should_publish_stats_only_when_operational() {
    let mut harness = Harness::kitchen_light();
    let stats = Stats {
        uptime: Duration::from_secs(120),
        interval: Duration::from_secs(60),
        signal: None,
        free_heap: None,
    };

    let err = harness
        .client
        .publish_stats(&mut harness.device, stats)
        .unwrap_err();
    assert!(matches!(err, HomieError::NotReady { .. }));

    harness.connect_and_announce();
    harness
        .client
        .publish_stats(&mut harness.device, stats)
        .unwrap();
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$stats/uptime").as_deref(),
        Some("120")
    );
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[test]
fn should_raise_alert_on_component_fault_and_clear_it() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    harness.set_light_fault(true);
    harness.follow_health();
    assert_eq!(harness.device.state(), DeviceState::Alert);
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("alert")
    );

    harness.set_light_fault(false);
    harness.follow_health();
    assert_eq!(harness.device.state(), DeviceState::Ready);
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("ready")
    );
}

#[test]
fn should_hold_fault_until_announced_and_restore_it_after_reconnect() {
    let mut harness = Harness::kitchen_light();
    harness.set_light_fault(true);

    harness.follow_health();
    assert_eq!(harness.device.state(), DeviceState::Init);
    assert!(harness.broker.delivered().is_empty());

    harness.connect_and_announce();
    harness.follow_health();
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("alert")
    );

    harness.broker.drop_connection();
    harness.client.on_disconnected(&mut harness.device);
    harness.connect_and_announce();
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("ready")
    );

    harness.follow_health();
    assert_eq!(harness.device.state(), DeviceState::Alert);
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("alert")
    );
}

// ---------------------------------------------------------------------------
// Disconnects
// ---------------------------------------------------------------------------

#[test]
fn should_report_lost_after_unclean_disconnect_and_recover() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    harness.broker.drop_connection();
    harness.client.on_disconnected(&mut harness.device);

    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("lost")
    );
    assert_eq!(harness.device.state(), DeviceState::Init);

    harness.connect_and_announce();

    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("ready")
    );
}

#[test]
fn should_leave_disconnected_after_graceful_shutdown() {
    let mut harness = Harness::kitchen_light();
    harness.connect_and_announce();

    harness.client.shutdown(&mut harness.device).unwrap();
    harness.broker.drop_connection();

    assert_eq!(harness.device.state(), DeviceState::Disconnected);
    assert_eq!(
        harness.broker.retained("homie/kitchen-light/$state").as_deref(),
        Some("disconnected")
    );
}
