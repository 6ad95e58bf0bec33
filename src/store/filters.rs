/*!
 * Storage Filters
 * Storage-key filter sets: OR within a key, AND across keys
 */

use super::fields::{field_source, FieldSource};
use crate::entries::Entry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// An accepted filter value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(i64),
    Text(String),
}

impl FilterValue {
    /// Compare against a stringified field value
    #[inline]
    fn matches_text(&self, candidate: &str) -> bool {
        match self {
            FilterValue::Text(s) => s.eq_ignore_ascii_case(candidate),
            FilterValue::Number(n) => candidate == n.to_string(),
        }
    }

    fn matches_value(&self, field: &Value) -> bool {
        match field {
            Value::Array(items) => items.iter().any(|item| self.matches_value(item)),
            Value::String(s) => self.matches_text(s),
            Value::Number(n) => match (self, n.as_i64()) {
                (FilterValue::Number(want), Some(have)) => *want == have,
                _ => self.matches_text(&n.to_string()),
            },
            Value::Bool(b) => self.matches_text(if *b { "true" } else { "false" }),
            Value::Null | Value::Object(_) => false,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n)
    }
}

/// Filters keyed by storage key
///
/// A key with an empty value list is present but matches nothing; an absent
/// key does not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageFilters {
    keys: BTreeMap<String, Vec<FilterValue>>,
}

impl StorageFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert`
    pub fn with<V: Into<FilterValue>>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.insert(key, values);
        self
    }

    /// Replace the values for `key`, dropping duplicates
    pub fn insert<V: Into<FilterValue>>(
        &mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) {
        let mut deduped: Vec<FilterValue> = Vec::new();
        for value in values.into_iter().map(Into::into) {
            if !deduped.contains(&value) {
                deduped.push(value);
            }
        }
        self.keys.insert(key.into(), deduped);
    }

    /// Merge values into `key`, keeping existing ones
    pub fn extend<V: Into<FilterValue>>(
        &mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) {
        let slot = self.keys.entry(key.into()).or_default();
        for value in values.into_iter().map(Into::into) {
            if !slot.contains(&value) {
                slot.push(value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[FilterValue]> {
        self.keys.get(key).map(Vec::as_slice)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FilterValue])> {
        self.keys.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Whether `entry` satisfies every key
    pub fn matches(&self, entry: &Entry) -> bool {
        // Serialized lazily, only when a search key is present
        let mut haystack: Option<String> = None;

        self.keys.iter().all(|(key, values)| match field_source(key) {
            FieldSource::Tags => values
                .iter()
                .any(|v| entry.tags.iter().any(|tag| v.matches_text(tag))),
            FieldSource::Search => {
                let text = haystack.get_or_insert_with(|| entry.payload.to_string().to_lowercase());
                values.iter().any(|needle| {
                    let needle = needle.to_string().to_lowercase();
                    text.contains(&needle)
                })
            }
            FieldSource::RequestId => entry
                .request_id
                .as_deref()
                .is_some_and(|id| values.iter().any(|v| v.matches_text(id))),
            FieldSource::Payload(pointer) => entry
                .field(&pointer)
                .is_some_and(|field| values.iter().any(|v| v.matches_value(field))),
        })
    }

    /// Encode as query pairs, values comma-joined
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.keys
            .iter()
            .map(|(k, values)| {
                let joined = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                (k.clone(), joined)
            })
            .collect()
    }
}
