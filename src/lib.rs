/*!
 * Telltale Recorder Library
 * In-process observability recorder exposed as a library
 */

pub mod collector;
pub mod core;
pub mod entries;
pub mod extract;
pub mod http;
pub mod query;
pub mod recorder;
pub mod store;
pub mod tail;
pub mod watchers;

// Re-exports
pub use collector::{Collector, CollectorStats, Observation, RequestContext};
pub use core::errors::*;
pub use core::{init_tracing, OverflowPolicy, RecorderConfig};
pub use entries::{Entry, EntryId, EntryType, NewEntry, RequestId, Sequence};
pub use query::{CursorMeta, CursorPage, CursorPaginator, CursorRequest};
pub use recorder::{Recorder, RecorderBuilder, Watchers};
pub use store::{EntryAnnotations, EntryStore, MemoryStore, RecorderStore, SharedStore, StorageFilters};
pub use tail::{HttpTailSource, LocalTailSource, TailConsumer, TailOptions, TailPoller, TailSource};
pub use watchers::{Facility, FacilityMap, Instrument};
