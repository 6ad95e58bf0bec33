/*!
 * In-Memory Entry Store
 * Sequence-ordered map guarded by a single reader-writer lock
 *
 * Every query runs under one read guard, so a page is always taken from a
 * single consistent snapshot.
 */

use super::filters::StorageFilters;
use super::traits::{EntryAnnotations, EntryStore, SequenceBound, StorePage, StoreQuery};
use crate::core::errors::{StoreError, StoreResult};
use crate::entries::{Entry, EntryId, EntryType, NewEntry, Sequence};
use ahash::RandomState;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    entries: BTreeMap<Sequence, Entry>,
    by_id: HashMap<EntryId, Sequence, RandomState>,
}

impl Inner {
    fn entry_mut(&mut self, id: &str) -> StoreResult<&mut Entry> {
        let sequence = *self
            .by_id
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.entries
            .get_mut(&sequence)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

/// In-memory store, cheap to clone (shared state)
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored sequences, ascending
    pub fn sequences(&self) -> Vec<Sequence> {
        self.inner.read().entries.keys().copied().collect()
    }
}

#[inline]
fn accepts(entry: &Entry, entry_type: Option<EntryType>, filters: &StorageFilters) -> bool {
    entry_type.map_or(true, |t| entry.entry_type == t) && filters.matches(entry)
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn insert(&self, entry: NewEntry) -> StoreResult<Entry> {
        let mut inner = self.inner.write();
        if inner.entries.contains_key(&entry.sequence) {
            return Err(StoreError::DuplicateSequence(entry.sequence));
        }

        let id = Uuid::new_v4().to_string();
        let sequence = entry.sequence;
        let stored = entry.into_entry(id.clone());
        inner.by_id.insert(id, sequence);
        inner.entries.insert(sequence, stored.clone());
        Ok(stored)
    }

    async fn query(&self, query: &StoreQuery) -> StoreResult<StorePage> {
        let inner = self.inner.read();
        let matching = |e: &&Entry| accepts(e, query.entry_type, &query.filters);
        let window = query.limit.saturating_add(1);

        let (mut entries, has_more) = match query.bound {
            SequenceBound::Latest => {
                let found: Vec<Entry> = inner
                    .entries
                    .values()
                    .rev()
                    .filter(matching)
                    .take(window)
                    .cloned()
                    .collect();
                let more = found.len() > query.limit;
                (found, more)
            }
            SequenceBound::Before(before) => {
                let found: Vec<Entry> = inner
                    .entries
                    .range(..before)
                    .rev()
                    .map(|(_, e)| e)
                    .filter(matching)
                    .take(window)
                    .cloned()
                    .collect();
                let more = found.len() > query.limit;
                (found, more)
            }
            SequenceBound::After(after) => {
                // Nearest entries above the bound, then flipped to newest-first
                let mut found: Vec<Entry> = inner
                    .entries
                    .range((Bound::Excluded(after), Bound::Unbounded))
                    .map(|(_, e)| e)
                    .filter(matching)
                    .take(window)
                    .cloned()
                    .collect();
                let more = found.len() > query.limit;
                found.truncate(query.limit);
                found.reverse();
                (found, more)
            }
        };
        entries.truncate(query.limit);

        let total = inner.entries.values().filter(matching).count() as u64;

        Ok(StorePage {
            entries,
            has_more,
            total,
        })
    }

    async fn count(&self, entry_type: Option<EntryType>, filters: &StorageFilters) -> StoreResult<u64> {
        let inner = self.inner.read();
        Ok(inner
            .entries
            .values()
            .filter(|e| accepts(e, entry_type, filters))
            .count() as u64)
    }

    async fn count_after(&self, after: Sequence, entry_type: Option<EntryType>) -> StoreResult<u64> {
        let inner = self.inner.read();
        Ok(inner
            .entries
            .range((Bound::Excluded(after), Bound::Unbounded))
            .filter(|(_, e)| entry_type.map_or(true, |t| e.entry_type == t))
            .count() as u64)
    }

    async fn latest_sequence(&self, entry_type: Option<EntryType>) -> StoreResult<Option<Sequence>> {
        let inner = self.inner.read();
        Ok(match entry_type {
            None => inner.entries.keys().next_back().copied(),
            Some(t) => inner
                .entries
                .values()
                .rev()
                .find(|e| e.entry_type == t)
                .map(|e| e.sequence),
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Entry>> {
        let inner = self.inner.read();
        Ok(inner
            .by_id
            .get(id)
            .and_then(|seq| inner.entries.get(seq))
            .cloned())
    }

    async fn prune(&self, older_than: OffsetDateTime) -> StoreResult<u64> {
        let mut inner = self.inner.write();
        let expired: Vec<(Sequence, EntryId)> = inner
            .entries
            .values()
            .filter(|e| e.created_at < older_than)
            .map(|e| (e.sequence, e.id.clone()))
            .collect();

        for (sequence, id) in &expired {
            inner.entries.remove(sequence);
            inner.by_id.remove(id);
        }
        Ok(expired.len() as u64)
    }

    async fn clear(&self) -> StoreResult<u64> {
        let mut inner = self.inner.write();
        let removed = inner.entries.len() as u64;
        inner.entries.clear();
        inner.by_id.clear();
        Ok(removed)
    }
}

#[async_trait]
impl EntryAnnotations for MemoryStore {
    async fn add_tags(&self, id: &str, tags: &[String]) -> StoreResult<BTreeSet<String>> {
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(id)?;
        entry.tags.extend(
            tags.iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
        Ok(entry.tags.clone())
    }

    async fn remove_tags(&self, id: &str, tags: &[String]) -> StoreResult<BTreeSet<String>> {
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(id)?;
        for tag in tags {
            entry.tags.remove(tag.trim());
        }
        Ok(entry.tags.clone())
    }

    async fn set_resolved(&self, id: &str, resolved_at: Option<OffsetDateTime>) -> StoreResult<Entry> {
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(id)?;
        if !entry.entry_type.is_resolvable() {
            return Err(StoreError::NotResolvable(entry.entry_type));
        }
        entry.resolved_at = resolved_at;
        Ok(entry.clone())
    }
}
