/*!
 * Cursor Filters
 * Category-level filter sets as a dashboard edits them
 */

use super::mapping::FilterKeyTable;
use crate::entries::EntryType;
use crate::store::{FilterValue, StorageFilters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Category name to accepted values
///
/// Values are OR'd within a category and categories are AND'd. A category
/// with an empty value list is a filter that matches nothing, which differs
/// from an absent category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorFilters {
    categories: BTreeMap<String, Vec<FilterValue>>,
}

impl CursorFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; false if it was already present
    pub fn add(&mut self, category: &str, value: impl Into<FilterValue>) -> bool {
        let value = value.into();
        let values = self.categories.entry(category.to_string()).or_default();
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    /// Builder form of `add`
    pub fn with(mut self, category: &str, value: impl Into<FilterValue>) -> Self {
        self.add(category, value);
        self
    }

    /// Remove a value; the category goes away with its last value
    pub fn remove(&mut self, category: &str, value: &FilterValue) -> bool {
        let Some(values) = self.categories.get_mut(category) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.clear_category(category);
        }
        removed
    }

    /// Set a category outright; an empty list keeps it as match-nothing
    pub fn set<V: Into<FilterValue>>(&mut self, category: &str, values: impl IntoIterator<Item = V>) {
        let mut deduped: Vec<FilterValue> = Vec::new();
        for value in values.into_iter().map(Into::into) {
            if !deduped.contains(&value) {
                deduped.push(value);
            }
        }
        self.categories.insert(category.to_string(), deduped);
    }

    /// Drop a category entirely
    pub fn clear_category(&mut self, category: &str) -> bool {
        self.categories.remove(category).is_some()
    }

    pub fn clear(&mut self) {
        self.categories.clear();
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn values(&self, category: &str) -> Option<&[FilterValue]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Translate categories into storage keys for `entry_type`
    ///
    /// Without an entry type, category names are used as storage keys.
    pub fn resolve(&self, entry_type: Option<EntryType>, table: &FilterKeyTable) -> StorageFilters {
        let mut resolved = StorageFilters::new();
        for (category, values) in &self.categories {
            let key = match entry_type {
                Some(t) => table.storage_key(t, category),
                None => {
                    debug!(category = %category, "No entry type, filter category used verbatim");
                    category.clone()
                }
            };
            // An empty list still creates the key, so it keeps matching nothing
            resolved.extend(key, values.iter().cloned());
        }
        resolved
    }
}
