/*!
 * Operation Watcher
 * Shared recorder for kinds without a dedicated facility
 *
 * Events, key-value commands, model changes, notifications, console
 * commands, authorization checks, batches, dumps and query-language
 * operations are recorded through explicit calls from the host.
 */

use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::Fields;
use serde_json::Value;
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;

#[derive(Clone)]
pub struct OperationWatcher {
    instrument: Instrument,
}

impl OperationWatcher {
    pub fn new(collector: Collector, entry_type: EntryType, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, entry_type, config),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.instrument.entry_type()
    }

    /// Record a discrete occurrence with no timing
    pub fn record(&self, fields: Fields) {
        self.instrument.emit(Value::Object(fields));
    }

    /// Time `op`, recording `fields` alongside its outcome
    pub fn call<T, E, F>(&self, fields: Fields, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
    {
        self.instrument.call(op, move |_| Ok(fields))
    }

    pub async fn call_async<T, E, Fut>(&self, fields: Fields, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.instrument.call_async(fut, move |_| Ok(fields)).await
    }

    /// Record an authorization decision and return it unchanged
    pub fn check(&self, ability: &str, decide: impl FnOnce() -> bool) -> bool {
        let decision = self.instrument.call::<bool, Infallible, _, _>(
            || Ok(decide()),
            |settled| {
                let allowed = settled.outcome.value().copied().unwrap_or(false);
                let mut fields = Fields::new();
                fields.insert("ability".into(), Value::from(ability));
                fields.insert(
                    "result".into(),
                    Value::from(if allowed { "allowed" } else { "denied" }),
                );
                Ok(fields)
            },
        );
        match decision {
            Ok(allowed) => allowed,
            Err(never) => match never {},
        }
    }
}
