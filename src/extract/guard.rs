/*!
 * Size Guard
 * Bounds caller-supplied data before it is copied into an entry
 */

use crate::core::config::RecorderConfig;
use crate::core::errors::ExtractError;
use serde::Serialize;
use serde_json::{json, Value};

/// Marker field set when data was discarded for size
pub const TRUNCATED_MARKER: &str = "_truncated";

/// Marker field carrying the serialized size of discarded data
pub const SIZE_MARKER: &str = "_size";

/// Marker field set when extraction or serialization failed
pub const ERROR_MARKER: &str = "_error";

/// Serialize `data`, replacing it with a marker when it exceeds `limit` bytes
///
/// Data of exactly `limit` bytes is kept verbatim. A value that cannot be
/// serialized becomes `{ "_error": "Unable to serialize" }`.
pub fn guard_size<T: Serialize + ?Sized>(data: &T, limit: usize) -> Value {
    let measured = serde_json::to_value(data).and_then(|value| {
        let size = serde_json::to_vec(&value)?.len();
        Ok((value, size))
    });

    match measured {
        Ok((value, size)) if size <= limit => value,
        Ok((_, size)) => json!({ TRUNCATED_MARKER: true, SIZE_MARKER: size }),
        Err(e) => {
            let err = ExtractError::Serialize(e.to_string());
            tracing::debug!(error = %e, "Captured data is not serializable");
            json!({ ERROR_MARKER: err.to_string() })
        }
    }
}

/// Gate for caller-supplied data capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataCapture {
    enabled: bool,
    limit: usize,
}

impl DataCapture {
    pub fn new(enabled: bool, limit: usize) -> Self {
        Self { enabled, limit }
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::new(config.capture_data, config.data_size_limit)
    }

    /// Never captures
    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Guarded copy of `data`, or `None` when capture is off
    pub fn capture<T: Serialize + ?Sized>(&self, data: &T) -> Option<Value> {
        self.enabled.then(|| guard_size(data, self.limit))
    }
}
