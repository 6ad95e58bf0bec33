/*!
 * Instrumentation Wrapper
 * Times an operation and records its outcome without touching its contract
 *
 * The wrapped operation's return value, error and panic pass through
 * unchanged. Recording happens exactly once per invocation after the
 * operation settles, and nothing on the recording path can fail the caller.
 */

use crate::collector::{Collector, Observation, RequestContext};
use crate::core::config::RecorderConfig;
use crate::core::errors::ExtractError;
use crate::entries::{EntryType, RequestId};
use crate::extract::{self, DataCapture, Fields};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use time::OffsetDateTime;

/// Start instant of one invocation
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: OffsetDateTime,
    start: Instant,
}

impl Stopwatch {
    #[inline]
    pub fn start() -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            start: Instant::now(),
        }
    }

    /// Wall-clock start, used as the entry's `createdAt`
    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    /// Elapsed milliseconds, two decimal places
    pub fn elapsed_ms(&self) -> f64 {
        (self.start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
    }
}

/// How an invocation settled
#[derive(Debug)]
pub enum Outcome<'a, T, E> {
    Completed(&'a T),
    Failed(&'a E),
    /// The operation panicked; the panic is resumed after recording
    Panicked(Option<String>),
    /// The future was dropped before it settled
    Cancelled,
}

impl<'a, T, E> Outcome<'a, T, E> {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Completed(_) => "completed",
            Outcome::Failed(_) | Outcome::Panicked(_) | Outcome::Cancelled => "failed",
        }
    }

    pub fn value(&self) -> Option<&'a T> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&'a E> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

impl<'a, T, E: Display> Outcome<'a, T, E> {
    /// Error message recorded for a failed outcome
    pub fn error_message(&self) -> Option<String> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Failed(err) => Some(err.to_string()),
            Outcome::Panicked(Some(msg)) => Some(format!("panicked: {msg}")),
            Outcome::Panicked(None) => Some("panicked".to_string()),
            Outcome::Cancelled => Some("cancelled".to_string()),
        }
    }
}

/// A settled invocation handed to the extractor
#[derive(Debug)]
pub struct Settled<'a, T, E> {
    pub outcome: Outcome<'a, T, E>,
    pub duration_ms: f64,
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

/// Per-kind recording handle shared by a watcher and its decorators
#[derive(Clone)]
pub struct Instrument {
    collector: Collector,
    entry_type: EntryType,
    enabled: bool,
    capture: DataCapture,
}

impl Instrument {
    pub fn new(collector: Collector, entry_type: EntryType, config: &RecorderConfig) -> Self {
        Self {
            collector,
            entry_type,
            enabled: config.watcher_enabled(entry_type),
            capture: DataCapture::from_config(config),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Whether this kind is recorded at all
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Data capture gate derived from configuration
    pub fn capture(&self) -> &DataCapture {
        &self.capture
    }

    /// Record a payload directly (fire-and-forget)
    pub fn emit(&self, payload: Value) {
        if self.enabled {
            self.collector.offer(Observation::new(self.entry_type, payload));
        }
    }

    /// Run a synchronous operation, recording its outcome
    pub fn call<T, E, F, X>(&self, op: F, extract: X) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
        X: FnOnce(&Settled<'_, T, E>) -> Result<Fields, ExtractError>,
    {
        if !self.enabled {
            return op();
        }

        let request_id = RequestContext::current();
        let stopwatch = Stopwatch::start();
        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(result) => {
                let outcome = match &result {
                    Ok(value) => Outcome::Completed(value),
                    Err(err) => Outcome::Failed(err),
                };
                self.settle(stopwatch, request_id, outcome, extract);
                result
            }
            Err(payload) => {
                let outcome = Outcome::<T, E>::Panicked(panic_message(payload.as_ref()));
                self.settle(stopwatch, request_id, outcome, extract);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Run an asynchronous operation, recording its outcome
    ///
    /// If the returned future is dropped before the operation settles, the
    /// invocation is recorded as cancelled.
    pub async fn call_async<T, E, Fut, X>(&self, fut: Fut, extract: X) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        X: FnOnce(&Settled<'_, T, E>) -> Result<Fields, ExtractError>,
    {
        if !self.enabled {
            return fut.await;
        }

        let mut guard = CancelGuard::<T, E, X> {
            armed: Some((
                self.clone(),
                Stopwatch::start(),
                RequestContext::current(),
                extract,
            )),
            _types: PhantomData,
        };

        let settled = AssertUnwindSafe(fut).catch_unwind().await;
        let Some((instrument, stopwatch, request_id, extract)) = guard.armed.take() else {
            // Unreachable: the guard is only disarmed here
            return match settled {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            };
        };

        match settled {
            Ok(result) => {
                let outcome = match &result {
                    Ok(value) => Outcome::Completed(value),
                    Err(err) => Outcome::Failed(err),
                };
                instrument.settle(stopwatch, request_id, outcome, extract);
                result
            }
            Err(payload) => {
                let outcome = Outcome::<T, E>::Panicked(panic_message(payload.as_ref()));
                instrument.settle(stopwatch, request_id, outcome, extract);
                panic::resume_unwind(payload)
            }
        }
    }

    fn settle<T, E, X>(
        &self,
        stopwatch: Stopwatch,
        request_id: Option<RequestId>,
        outcome: Outcome<'_, T, E>,
        extract: X,
    ) where
        E: Display,
        X: FnOnce(&Settled<'_, T, E>) -> Result<Fields, ExtractError>,
    {
        let settled = Settled {
            duration_ms: stopwatch.elapsed_ms(),
            outcome,
        };

        let mut base = Fields::new();
        base.insert("duration".into(), Value::from(settled.duration_ms));
        base.insert("status".into(), Value::from(settled.outcome.status()));
        if let Some(message) = settled.outcome.error_message() {
            base.insert("error".into(), Value::String(message));
        }

        let payload = extract::total(base, || extract(&settled));
        let observation = Observation::new(self.entry_type, payload)
            .at(stopwatch.started_at())
            .with_request_id(request_id);
        self.collector.offer(observation);
    }
}

/// Records a cancelled invocation if dropped while still armed
struct CancelGuard<T, E, X>
where
    E: Display,
    X: FnOnce(&Settled<'_, T, E>) -> Result<Fields, ExtractError>,
{
    armed: Option<(Instrument, Stopwatch, Option<RequestId>, X)>,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<T, E, X> Drop for CancelGuard<T, E, X>
where
    E: Display,
    X: FnOnce(&Settled<'_, T, E>) -> Result<Fields, ExtractError>,
{
    fn drop(&mut self) {
        if let Some((instrument, stopwatch, request_id, extract)) = self.armed.take() {
            instrument.settle(stopwatch, request_id, Outcome::<T, E>::Cancelled, extract);
        }
    }
}
