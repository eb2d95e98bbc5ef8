//! `$log` forwarding: a `tracing_subscriber` layer republishing log events.
//!
//! Forwarding must never block or fail device operation, so publish errors
//! are dropped and events emitted while forwarding (e.g. by the MQTT client
//! itself) are skipped.

use std::cell::Cell;
use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use homie_domain::id::DeviceId;
use homie_domain::message::Message;
use homie_domain::settings::HomieSettings;

use crate::ports::Transport;

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Layer publishing events at or above a level to `<device>/$log`.
pub struct LogForwarder<T> {
    transport: T,
    template: Message,
    level: Level,
}

impl<T> fmt::Debug for LogForwarder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogForwarder")
            .field("topic", &self.template.topic)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> LogForwarder<T> {
    /// Forward to `<prefix>/<device_id>/$log`, non-retained.
    #[must_use]
    pub fn new(transport: T, settings: &HomieSettings, device_id: &DeviceId, level: Level) -> Self {
        let template = Message::build(
            &settings.prefix,
            device_id.as_str(),
            "$log",
            String::new(),
            settings.qos,
            false,
        );
        Self {
            transport,
            template,
            level,
        }
    }

    fn forward(&self, payload: String) {
        let message = Message {
            payload,
            ..self.template.clone()
        };
        // errors are swallowed: there is nowhere left to report them
        let _ = self.transport.publish(&message);
    }
}

impl<S, T> Layer<S> for LogForwarder<T>
where
    S: Subscriber,
    T: Transport + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // more verbose levels compare greater
        if *metadata.level() > self.level || metadata.target().starts_with("rumqttc") {
            return;
        }
        if FORWARDING.with(Cell::get) {
            return;
        }
        FORWARDING.with(|flag| flag.set(true));

        let mut line = LineVisitor::default();
        event.record(&mut line);
        self.forward(format!(
            "{} {}: {}{}",
            metadata.level(),
            metadata.target(),
            line.message,
            line.fields
        ));

        FORWARDING.with(|flag| flag.set(false));
    }
}

/// Renders the `message` field followed by ` key=value` pairs.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::client::tests::RecordingTransport;

    fn forwarder(transport: &RecordingTransport, level: Level) -> LogForwarder<RecordingTransport> {
        LogForwarder::new(
            transport.clone(),
            &HomieSettings::default(),
            &DeviceId::new("kitchen-light").unwrap(),
            level,
        )
    }

    #[test]
    fn should_forward_events_at_or_above_level() {
        let transport = RecordingTransport::default();
        let subscriber = tracing_subscriber::registry().with(forwarder(&transport, Level::WARN));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("too chatty");
            tracing::warn!(node = "light", "overheated");
            tracing::error!("relay stuck");
        });

        let published = transport.published();
        assert_eq!(published.len(), 2);
        assert!(published[0].starts_with("homie/kitchen-light/$log=WARN "));
        assert!(published[0].ends_with(": overheated node=light"));
        assert!(published[1].ends_with(": relay stuck"));
    }

    #[test]
    fn should_publish_log_lines_non_retained() {
        let transport = RecordingTransport::default();
        let subscriber = tracing_subscriber::registry().with(forwarder(&transport, Level::INFO));

        tracing::subscriber::with_default(subscriber, || tracing::info!("booted"));

        let calls = transport.calls();
        let Some(crate::client::tests::Call::Publish(message)) = calls.first() else {
            panic!("expected a publish");
        };
        assert_eq!(message.topic, "homie/kitchen-light/$log");
        assert!(!message.retain);
    }

    #[test]
    fn should_swallow_publish_failures() {
        let transport = RecordingTransport::default();
        transport.fail_on(Some("*"));
        let subscriber = tracing_subscriber::registry().with(forwarder(&transport, Level::TRACE));

        tracing::subscriber::with_default(subscriber, || tracing::error!("still running"));

        assert!(transport.calls().is_empty());
    }
}
