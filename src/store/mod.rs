/*!
 * Entry Store
 * Storage interface, storage-level filters and the in-memory engine
 */

mod fields;
mod filters;
mod memory;
mod traits;

pub use fields::{field_source, is_known_key, FieldSource, REQUEST_IDS_KEY, SEARCH_KEY, TAGS_KEY};
pub use filters::{FilterValue, StorageFilters};
pub use memory::MemoryStore;
pub use traits::{EntryAnnotations, EntryStore, RecorderStore, SequenceBound, StorePage, StoreQuery};

/// Shared handle to the configured store
pub type SharedStore = std::sync::Arc<dyn RecorderStore>;
