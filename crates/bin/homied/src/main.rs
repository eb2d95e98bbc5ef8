//! # homied: Homie device daemon
//!
//! Composition root that wires the adapters together and runs the device
//! loop.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise tracing, optionally forwarding events to `$log`
//! - Register node classes, seal the registry and assemble the device
//! - Size the request queue for the announce, arm the `$state=lost` last
//!   will, then open the MQTT session
//! - Follow component health with `$state=alert` / `$state=ready`
//! - Drive transport events, component updates, the stats timer and the
//!   shutdown signal from a single task
//! - Shut down gracefully (`$state=disconnected`, clean disconnect)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use homie_adapter_mqtt::MqttTransport;
use homie_adapter_virtual::VirtualIntegration;
use homie_app::assembly::assemble;
use homie_app::client::{HomieClient, Inbound};
use homie_app::ports::{Component, PropertyUpdate, TransportEvent};
use homie_app::registry::Registry;
use homie_domain::device::Device;
use homie_domain::error::HomieError;
use homie_domain::state::DeviceState;
use homie_domain::stats::Stats;

use crate::config::Config;

/// Upper bound for flushing the clean disconnect on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let device_id = config.device_id()?;

    // Client: the transport is shared with the `$log` forwarder, so tracing
    // can come up before the session exists
    let mut client = HomieClient::new(MqttTransport::new(&config.mqtt), config.settings());
    if let Some(birth) = config.homie.birth.clone() {
        client = client.with_birth_message(birth.into());
    }
    if let Some(shutdown) = config.homie.shutdown.clone() {
        client = client.with_shutdown_message(shutdown.into());
    }

    // Tracing
    let forwarder = config
        .log_forward_level()?
        .map(|level| client.setup_logging(&device_id, level));
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(forwarder)
        .init();

    // Device
    let mut builder = Device::builder()
        .id(device_id.as_str())
        .name(config.homie.name.as_str())
        .firmware(
            config.homie.firmware_name.as_str(),
            config.homie.firmware_version.as_str(),
        )
        .implementation(env!("CARGO_PKG_NAME"));
    for (key, value) in &config.homie.attributes {
        builder = builder.attribute(key.as_str(), value.as_str());
    }
    let mut device = builder.build()?;

    // Components
    let mut registry = Registry::new();
    homie_adapter_virtual::register_node_classes(&mut registry)?;
    let integration = VirtualIntegration::from_config(&config.components);
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();
    let attached = assemble(
        &mut device,
        &mut registry,
        integration.components(),
        &updates_tx,
    )
    .context("failed to assemble device")?;

    // Session: the whole announce must fit the request queue, and the will
    // must be armed before connecting
    let announce = client.announce_size(&device);
    client.transport_mut().reserve(announce);
    client.configure_last_will(&device_id)?;
    let mut session = client.transport_mut().connect()?;
    tracing::info!(
        device = %device_id,
        integration = integration.name(),
        nodes = attached,
        broker = %config.mqtt.broker_host,
        queue = client.transport().capacity(),
        "homied starting"
    );

    // Loop
    let started = Instant::now();
    let mut stats_timer = tokio::time::interval(config.stats_interval());
    stats_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = session.next_event() => on_transport_event(&client, &mut device, event),
            Some(update) = updates_rx.recv() => on_update(&client, &mut device, update),
            _ = stats_timer.tick() => {
                let stats = Stats {
                    uptime: started.elapsed(),
                    interval: config.stats_interval(),
                    signal: None,
                    free_heap: None,
                };
                on_stats_tick(&client, &mut device, stats, session.is_connected());
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!(%err, "failed to listen for shutdown signal");
                }
                break;
            }
        }
        let faulted = integration.components().any(Component::is_faulted);
        if let Err(err) = client.apply_health(&mut device, faulted) {
            tracing::warn!(%err, faulted, "health state not published");
        }
    }

    tracing::info!("shutting down");
    if let Err(err) = client.shutdown(&mut device) {
        tracing::warn!(%err, "clean disconnect failed");
    }
    if !session.drain(DRAIN_TIMEOUT).await {
        tracing::warn!(timeout = ?DRAIN_TIMEOUT, "disconnect not flushed in time");
    }
    Ok(())
}

fn on_transport_event(
    client: &HomieClient<MqttTransport>,
    device: &mut Device,
    event: TransportEvent,
) {
    match event {
        TransportEvent::Connected => {
            if let Err(err) = client.start_homie(device) {
                tracing::warn!(%err, "announce failed, retrying on next stats tick");
            }
        }
        TransportEvent::Disconnected => client.on_disconnected(device),
        TransportEvent::Message { topic, payload } => {
            match client.handle_message(device, &topic, &payload) {
                Ok(Inbound::Set {
                    node_id,
                    property_id,
                    value,
                }) => tracing::info!(node = %node_id, property = %property_id, %value, "set"),
                Ok(Inbound::Broadcast { level, payload }) => {
                    tracing::info!(%level, %payload, "broadcast received");
                }
                Ok(Inbound::Ignored) => {}
                Err(err) => tracing::warn!(%err, %topic, "inbound message dropped"),
            }
        }
    }
}

fn on_update(client: &HomieClient<MqttTransport>, device: &mut Device, update: PropertyUpdate) {
    let PropertyUpdate {
        node_id,
        property_id,
        value,
    } = update;
    match client.publish_value(device, node_id.as_str(), &property_id, value) {
        Ok(()) => {}
        Err(HomieError::NotReady { state }) => {
            tracing::debug!(node = %node_id, property = %property_id, %state, "update held back");
        }
        Err(err) => tracing::warn!(%err, node = %node_id, property = %property_id, "update dropped"),
    }
}

fn on_stats_tick(
    client: &HomieClient<MqttTransport>,
    device: &mut Device,
    stats: Stats,
    connected: bool,
) {
    match client.publish_stats(device, stats) {
        Ok(()) => {}
        Err(HomieError::NotReady { .. }) if connected && device.state() == DeviceState::Init => {
            if let Err(err) = client.start_homie(device) {
                tracing::warn!(%err, "announce retry failed");
            }
        }
        Err(HomieError::NotReady { state }) => tracing::debug!(%state, "stats skipped"),
        Err(err) => tracing::warn!(%err, "stats publish failed"),
    }
}
