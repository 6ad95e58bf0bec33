/*!
 * Entry Store Traits
 * Interface to the durable append-oriented storage engine
 */

use super::filters::StorageFilters;
use crate::core::errors::StoreResult;
use crate::entries::{Entry, EntryType, NewEntry, Sequence};
use async_trait::async_trait;
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Sequence bound of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceBound {
    /// Most recent entries
    #[default]
    Latest,
    /// `sequence < S`
    Before(Sequence),
    /// `sequence > S`
    After(Sequence),
}

/// Range query by sequence with filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    pub entry_type: Option<EntryType>,
    pub bound: SequenceBound,
    pub limit: usize,
    pub filters: StorageFilters,
}

/// One range query result, read from a single consistent snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct StorePage {
    /// Sorted by sequence, newest first
    pub entries: Vec<Entry>,
    /// More matching entries exist beyond the page, in the query's direction
    pub has_more: bool,
    /// All entries matching type and filters, ignoring the bound
    pub total: u64,
}

/// Durable entry storage
///
/// Implementations must answer `query` from one consistent snapshot: an entry
/// inserted while a query runs is either wholly visible or wholly invisible.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist an accepted observation and assign its id
    async fn insert(&self, entry: NewEntry) -> StoreResult<Entry>;

    /// Range query by sequence
    async fn query(&self, query: &StoreQuery) -> StoreResult<StorePage>;

    /// Count entries matching type and filters
    async fn count(&self, entry_type: Option<EntryType>, filters: &StorageFilters) -> StoreResult<u64>;

    /// Count entries newer than `after`
    async fn count_after(&self, after: Sequence, entry_type: Option<EntryType>) -> StoreResult<u64>;

    /// Highest stored sequence
    async fn latest_sequence(&self, entry_type: Option<EntryType>) -> StoreResult<Option<Sequence>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Entry>>;

    /// Delete entries created before `older_than`, returning how many went
    async fn prune(&self, older_than: OffsetDateTime) -> StoreResult<u64>;

    /// Delete every entry
    async fn clear(&self) -> StoreResult<u64>;
}

/// Tag and triage mutation, owned by an external API rather than the collector
#[async_trait]
pub trait EntryAnnotations: Send + Sync {
    /// Add tags, returning the resulting set
    async fn add_tags(&self, id: &str, tags: &[String]) -> StoreResult<BTreeSet<String>>;

    /// Remove tags, returning the resulting set
    async fn remove_tags(&self, id: &str, tags: &[String]) -> StoreResult<BTreeSet<String>>;

    /// Set or clear `resolved_at`
    async fn set_resolved(&self, id: &str, resolved_at: Option<OffsetDateTime>) -> StoreResult<Entry>;
}

/// Storage with both the append path and the annotation path
pub trait RecorderStore: EntryStore + EntryAnnotations {}

impl<T> RecorderStore for T where T: EntryStore + EntryAnnotations {}
