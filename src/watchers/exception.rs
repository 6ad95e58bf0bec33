/*!
 * Exception Reporter
 * Records host errors and panics as resolvable `exception` entries
 */

use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::core::limits::MAX_ERROR_CHAIN;
use crate::entries::EntryType;
use crate::extract::{ExceptionPayload, ToPayload};
use serde_json::Value;
use std::error::Error;
use std::panic;

/// Last path segment of a type name, generics stripped
fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn source_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        if chain.len() == MAX_ERROR_CHAIN {
            break;
        }
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

#[derive(Clone)]
pub struct ExceptionReporter {
    instrument: Instrument,
}

impl ExceptionReporter {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Exception, config),
        }
    }

    /// Record a typed error; its class is the type's name
    pub fn report<E: Error + 'static>(&self, error: &E) {
        self.report_as(&short_type_name::<E>(), error);
    }

    /// Record an `anyhow` error with its full context chain
    pub fn report_anyhow(&self, error: &anyhow::Error) {
        self.report_as("Error", error.as_ref());
    }

    /// Record an error under an explicit class
    pub fn report_as(&self, class: &str, error: &(dyn Error + 'static)) {
        self.emit(ExceptionPayload {
            class: class.to_string(),
            message: error.to_string(),
            chain: source_chain(error),
            location: None,
        });
    }

    /// Chain a panic hook that records every panic before the previous hook runs
    pub fn install_panic_hook(&self) {
        if !self.instrument.is_enabled() {
            return;
        }
        let reporter = self.clone();
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            reporter.emit(ExceptionPayload {
                class: "Panic".to_string(),
                message,
                chain: Vec::new(),
                location: info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
            });
            previous(info);
        }));
    }

    fn emit(&self, payload: ExceptionPayload) {
        if let Ok(fields) = payload.to_fields() {
            self.instrument.emit(Value::Object(fields));
        }
    }
}
