/*!
 * Recorder Limits and Constants
 *
 * Centralized location for thresholds and defaults used across the recorder.
 * Organized by domain: capture, collection, pagination, live tail.
 */

use std::time::Duration;

// =============================================================================
// CAPTURE LIMITS
// =============================================================================

/// Serialized size above which captured caller data is replaced by a marker (4KB)
/// A payload of exactly this many bytes is kept verbatim
pub const DATA_SIZE_LIMIT: usize = 4096;

/// Queries at or above this duration are flagged `slow`
pub const SLOW_QUERY_MS: u64 = 100;

/// Maximum number of error sources walked when capturing an exception chain
pub const MAX_ERROR_CHAIN: usize = 16;

// =============================================================================
// COLLECTION LIMITS
// =============================================================================

/// Collector queue capacity (pending observations awaiting persistence)
pub const COLLECTOR_QUEUE_CAPACITY: usize = 4096;

// =============================================================================
// PAGINATION LIMITS
// =============================================================================

/// Page size used when a request omits `limit`
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Largest page a single cursor request may return
pub const MAX_PAGE_LIMIT: usize = 500;

// =============================================================================
// LIVE TAIL
// =============================================================================

/// Live-tail poll period
pub const TAIL_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Settings key suffix for the persisted auto-refresh flag
pub const AUTO_REFRESH_SETTING: &str = "auto-refresh";
