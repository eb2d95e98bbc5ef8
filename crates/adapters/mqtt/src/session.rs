//! Inbound half of the MQTT session.
//!
//! A spawned task owns the rumqttc [`EventLoop`] and keeps polling it, so
//! the request queue drains while the device loop is busy (e.g. submitting
//! the announce). Session changes and incoming publishes reach the device
//! loop as [`TransportEvent`]s.

use std::time::Duration;

use rumqttc::{ConnectionError, Event, EventLoop, Outgoing, Packet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use homie_app::ports::TransportEvent;

/// Receiving end of the event loop task.
#[derive(Debug)]
pub struct MqttSession {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    pump: JoinHandle<()>,
    connected: bool,
}

impl MqttSession {
    pub(crate) fn spawn(eventloop: EventLoop, reconnect_delay: Duration) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump(eventloop, tx, reconnect_delay));
        Self::new(events, pump)
    }

    fn new(events: mpsc::UnboundedReceiver<TransportEvent>, pump: JoinHandle<()>) -> Self {
        Self {
            events,
            pump,
            connected: false,
        }
    }

    /// Whether the last event handed out was a connect rather than a
    /// disconnect.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Next session event, `None` once the event loop stopped.
    ///
    /// Cancel-safe.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let event = self.events.recv().await?;
        match event {
            TransportEvent::Connected => self.connected = true,
            TransportEvent::Disconnected => self.connected = false,
            TransportEvent::Message { .. } => {}
        }
        Some(event)
    }

    /// Wait until the clean disconnect went out, at most `timeout`.
    ///
    /// Returns whether the disconnect was flushed in time. The event loop
    /// task is stopped either way.
    pub async fn drain(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, &mut self.pump).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::warn!(%err, "mqtt event loop task failed");
                false
            }
            Err(_) => {
                self.pump.abort();
                false
            }
        }
    }
}

/// What the event loop task does with one poll result.
#[derive(Debug, PartialEq)]
enum Step {
    Emit(TransportEvent),
    /// Connection error: wait, then poll again (which reconnects).
    /// `lost` is set for the first error after a successful connect.
    Retry { lost: bool },
    Skip,
    /// The clean disconnect was flushed, or every client is gone.
    Done,
}

#[derive(Debug, Default)]
struct Pump {
    connected: bool,
}

impl Pump {
    fn step(&mut self, polled: Result<Event, ConnectionError>) -> Step {
        match polled {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!(session_present = ack.session_present, "mqtt connected");
                self.connected = true;
                Step::Emit(TransportEvent::Connected)
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => Step::Emit(TransportEvent::Message {
                        topic: publish.topic,
                        payload,
                    }),
                    Err(err) => {
                        tracing::warn!(%err, topic = %publish.topic, "dropping non UTF-8 payload");
                        Step::Skip
                    }
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("disconnect flushed");
                Step::Done
            }
            Ok(_) => Step::Skip,
            Err(ConnectionError::RequestsDone) => Step::Done,
            Err(err) => {
                let lost = std::mem::replace(&mut self.connected, false);
                tracing::warn!(%err, lost, "mqtt connection error");
                Step::Retry { lost }
            }
        }
    }
}

async fn pump(
    mut eventloop: EventLoop,
    events: mpsc::UnboundedSender<TransportEvent>,
    reconnect_delay: Duration,
) {
    let mut state = Pump::default();
    loop {
        let event = match state.step(eventloop.poll().await) {
            Step::Emit(event) => event,
            Step::Retry { lost } => {
                if lost && events.send(TransportEvent::Disconnected).is_err() {
                    return;
                }
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
            Step::Skip => continue,
            Step::Done => return,
        };
        if events.send(event).is_err() {
            tracing::debug!("session dropped, stopping mqtt event loop");
            return;
        }
    }
}
