/*!
 * Payload Extraction
 *
 * Derives typed payload fields from a settled invocation. Extraction is
 * total: an extractor that errors or panics leaves the base fields in place
 * and adds an `_error` marker instead of raising.
 */

mod guard;
mod payloads;
mod shape;

pub use guard::{guard_size, DataCapture, ERROR_MARKER, SIZE_MARKER, TRUNCATED_MARKER};
pub use payloads::{
    CachePayload, ExceptionPayload, HttpClientPayload, JobPayload, LogPayload, MailPayload,
    QueryPayload, RequestPayload, SchedulePayload, ToPayload, ViewPayload,
};
pub use shape::{CallOptions, CallShape};

use crate::core::errors::ExtractError;
use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Fields produced by an extractor
pub type Fields = Map<String, Value>;

/// Run `extract` and merge its fields over `base`
///
/// Never panics and never fails.
pub fn total<F>(mut base: Fields, extract: F) -> Value
where
    F: FnOnce() -> Result<Fields, ExtractError>,
{
    let error = match catch_unwind(AssertUnwindSafe(extract)) {
        Ok(Ok(fields)) => {
            for (key, value) in fields {
                base.insert(key, value);
            }
            None
        }
        Ok(Err(e)) => Some(e),
        Err(_) => Some(ExtractError::Panicked),
    };

    if let Some(e) = error {
        debug!(error = %e, "Payload extraction degraded");
        base.insert(ERROR_MARKER.to_string(), Value::String(e.to_string()));
    }
    Value::Object(base)
}
