/*!
 * Log Watcher
 * `tracing` layer turning host log events into `log` entries
 */

use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{LogPayload, ToPayload};
use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Events from these targets are never recorded
const SELF_TARGET: &str = "telltale";

/// Records every host event as a `log` entry
#[derive(Clone)]
pub struct LogWatchLayer {
    instrument: Instrument,
}

impl LogWatchLayer {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Log, config),
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    context: Map<String, Value>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.context.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, Value::String(format!("{value:?}")));
    }
}

impl<S: Subscriber> Layer<S> for LogWatchLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.instrument.is_enabled() {
            return;
        }
        let metadata = event.metadata();
        if metadata.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let payload = LogPayload {
            level: metadata.level().as_str().to_ascii_lowercase(),
            message: visitor.message.unwrap_or_default(),
            target: metadata.target().to_string(),
            context: visitor.context,
        };
        if let Ok(fields) = payload.to_fields() {
            self.instrument.emit(Value::Object(fields));
        }
    }
}
