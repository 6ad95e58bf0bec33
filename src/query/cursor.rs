/*!
 * Cursor Pagination
 * Keyset paging over the sequence order
 */

use crate::core::errors::{QueryError, QueryResult};
use crate::core::limits::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::entries::{Entry, EntryType, Sequence};
use crate::store::{EntryStore, SequenceBound, StorageFilters, StoreQuery};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One page request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorRequest {
    pub entry_type: Option<EntryType>,
    pub limit: Option<usize>,
    pub before_sequence: Option<Sequence>,
    pub after_sequence: Option<Sequence>,
    pub filters: StorageFilters,
}

impl CursorRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn before(mut self, sequence: Sequence) -> Self {
        self.before_sequence = Some(sequence);
        self
    }

    pub fn after(mut self, sequence: Sequence) -> Self {
        self.after_sequence = Some(sequence);
        self
    }

    pub fn filters(mut self, filters: StorageFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Validated store query
    pub fn to_store_query(&self) -> QueryResult<StoreQuery> {
        let bound = match (self.before_sequence, self.after_sequence) {
            (Some(_), Some(_)) => return Err(QueryError::ConflictingCursors),
            (Some(before), None) => SequenceBound::Before(before),
            (None, Some(after)) => SequenceBound::After(after),
            (None, None) => SequenceBound::Latest,
        };

        let limit = match self.limit {
            None => DEFAULT_PAGE_LIMIT,
            Some(0) => return Err(QueryError::InvalidLimit("limit must be at least 1".into())),
            Some(n) => n.min(MAX_PAGE_LIMIT),
        };

        Ok(StoreQuery {
            entry_type: self.entry_type,
            bound,
            limit,
            filters: self.filters.clone(),
        })
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMeta {
    pub has_more: bool,
    pub oldest_sequence: Option<Sequence>,
    pub newest_sequence: Option<Sequence>,
    pub total: u64,
}

/// Entries sorted newest first, with pagination metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CursorPage {
    pub data: Vec<Entry>,
    pub meta: CursorMeta,
}

impl CursorPage {
    pub fn sequences(&self) -> Vec<Sequence> {
        self.data.iter().map(|e| e.sequence).collect()
    }
}

/// Cursor pagination over an entry store
pub struct CursorPaginator<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for CursorPaginator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> CursorPaginator<S>
where
    S: EntryStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch one page
    ///
    /// Paging backward with `before = meta.oldest_sequence` visits every
    /// matching entry exactly once.
    pub async fn page(&self, request: &CursorRequest) -> QueryResult<CursorPage> {
        let query = request.to_store_query()?;
        let page = self.store.query(&query).await?;

        let (newest_sequence, oldest_sequence) = match (page.entries.first(), page.entries.last()) {
            (Some(first), Some(last)) => (Some(first.sequence), Some(last.sequence)),
            _ => (None, None),
        };

        Ok(CursorPage {
            meta: CursorMeta {
                has_more: page.has_more,
                oldest_sequence,
                newest_sequence,
                total: page.total,
            },
            data: page.entries,
        })
    }

    /// Highest stored sequence of `entry_type` (or overall)
    pub async fn latest_sequence(&self, entry_type: Option<EntryType>) -> QueryResult<Option<Sequence>> {
        Ok(self.store.latest_sequence(entry_type).await?)
    }

    /// Number of entries newer than `after`
    pub async fn check_new(&self, after: Sequence, entry_type: Option<EntryType>) -> QueryResult<u64> {
        Ok(self.store.count_after(after, entry_type).await?)
    }

    /// Count matching entries regardless of position
    pub async fn count(&self, entry_type: Option<EntryType>, filters: &StorageFilters) -> QueryResult<u64> {
        Ok(self.store.count(entry_type, filters).await?)
    }
}
