/*!
 * Filter Key Mapping
 * Category to storage-key table per entry type
 */

use crate::entries::{Entry, EntryType};
use crate::store::{StorageFilters, REQUEST_IDS_KEY, SEARCH_KEY, TAGS_KEY};
use ahash::RandomState;
use std::collections::HashMap;
use tracing::warn;

use EntryType::*;

static STANDARD_KEYS: &[(EntryType, &str, &str)] = &[
    (Request, "statuses", "statuses"),
    (Request, "methods", "methods"),
    (Query, "statuses", "queryStatuses"),
    (Query, "operations", "queryOperations"),
    (Exception, "classes", "exceptionClasses"),
    (Log, "levels", "levels"),
    (Cache, "operations", "cacheOperations"),
    (Event, "names", "eventNames"),
    (Job, "statuses", "jobStatuses"),
    (Job, "queues", "queues"),
    (Schedule, "statuses", "scheduleStatuses"),
    (Mail, "statuses", "mailStatuses"),
    (HttpClient, "statuses", "httpClientStatuses"),
    (HttpClient, "methods", "httpClientMethods"),
    (Redis, "statuses", "redisStatuses"),
    (Redis, "commands", "redisCommands"),
    (Model, "actions", "modelActions"),
    (Notification, "statuses", "notificationStatuses"),
    (Notification, "channels", "channels"),
    (View, "statuses", "viewStatuses"),
    (View, "formats", "viewFormats"),
    (Command, "statuses", "commandStatuses"),
    (Gate, "results", "gateResults"),
    (Batch, "statuses", "batchStatuses"),
    (Dump, "statuses", "dumpStatuses"),
    (Graphql, "statuses", "graphqlStatuses"),
    (Graphql, "operations", "graphqlOperations"),
];

/// Whether `category` is reserved on every entry type
#[inline]
pub fn is_reserved(category: &str) -> bool {
    matches!(category, TAGS_KEY | SEARCH_KEY | REQUEST_IDS_KEY)
}

/// Static category table with optional host overrides
#[derive(Debug, Clone, Default)]
pub struct FilterKeyTable {
    overrides: HashMap<(EntryType, String), String, RandomState>,
}

impl FilterKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an extra or replacement category for `entry_type`
    pub fn with_key(
        mut self,
        entry_type: EntryType,
        category: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        self.overrides
            .insert((entry_type, category.into()), storage_key.into());
        self
    }

    /// Mapped key, if the table has one
    pub fn lookup(&self, entry_type: EntryType, category: &str) -> Option<&str> {
        if let Some(key) = self.overrides.get(&(entry_type, category.to_string())) {
            return Some(key);
        }
        STANDARD_KEYS
            .iter()
            .find(|(t, c, _)| *t == entry_type && *c == category)
            .map(|(_, _, key)| *key)
    }

    /// Storage key for `category`; unmapped categories are used verbatim
    pub fn storage_key(&self, entry_type: EntryType, category: &str) -> String {
        if is_reserved(category) {
            return category.to_string();
        }
        match self.lookup(entry_type, category) {
            Some(key) => key.to_string(),
            None => {
                warn!(
                    entry_type = %entry_type,
                    category, "No storage key mapped for filter category, using it verbatim"
                );
                category.to_string()
            }
        }
    }

    /// Categories mapped for `entry_type`, for building filter pickers
    pub fn categories(&self, entry_type: EntryType) -> Vec<&str> {
        let mut categories: Vec<&str> = STANDARD_KEYS
            .iter()
            .filter(|(t, _, _)| *t == entry_type)
            .map(|(_, c, _)| *c)
            .chain(
                self.overrides
                    .keys()
                    .filter(|(t, _)| *t == entry_type)
                    .map(|(_, c)| c.as_str()),
            )
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}

/// Storage key for `category` under the standard table
pub fn storage_key(entry_type: EntryType, category: &str) -> String {
    FilterKeyTable::new().storage_key(entry_type, category)
}

/// Keep the candidates that satisfy every storage key in `filters`
pub fn apply_filters<I>(candidates: I, filters: &StorageFilters) -> Vec<Entry>
where
    I: IntoIterator<Item = Entry>,
{
    candidates.into_iter().filter(|e| filters.matches(e)).collect()
}
