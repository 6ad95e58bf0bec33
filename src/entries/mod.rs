/*!
 * Entries
 * Data model shared by collection, storage and querying
 */

mod types;

pub use types::{Entry, EntryId, EntryType, NewEntry, RequestId, Sequence, UnknownEntryType};
