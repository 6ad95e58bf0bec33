/*!
 * Entry Types
 * The atomic unit of observation and its closed set of kinds
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Total-order key assigned by the collector
pub type Sequence = u64;

/// Storage-assigned entry identifier
pub type EntryId = String;

/// Request correlation identifier
pub type RequestId = String;

/// Entry kind - one per instrumented subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    Request,
    Query,
    Exception,
    Log,
    Cache,
    Event,
    Job,
    Schedule,
    Mail,
    HttpClient,
    Redis,
    Model,
    Notification,
    View,
    Command,
    Gate,
    Batch,
    Dump,
    Graphql,
}

impl EntryType {
    pub const ALL: [EntryType; 19] = [
        EntryType::Request,
        EntryType::Query,
        EntryType::Exception,
        EntryType::Log,
        EntryType::Cache,
        EntryType::Event,
        EntryType::Job,
        EntryType::Schedule,
        EntryType::Mail,
        EntryType::HttpClient,
        EntryType::Redis,
        EntryType::Model,
        EntryType::Notification,
        EntryType::View,
        EntryType::Command,
        EntryType::Gate,
        EntryType::Batch,
        EntryType::Dump,
        EntryType::Graphql,
    ];

    /// Wire name (`http-client`, `graphql`, ...)
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryType::Request => "request",
            EntryType::Query => "query",
            EntryType::Exception => "exception",
            EntryType::Log => "log",
            EntryType::Cache => "cache",
            EntryType::Event => "event",
            EntryType::Job => "job",
            EntryType::Schedule => "schedule",
            EntryType::Mail => "mail",
            EntryType::HttpClient => "http-client",
            EntryType::Redis => "redis",
            EntryType::Model => "model",
            EntryType::Notification => "notification",
            EntryType::View => "view",
            EntryType::Command => "command",
            EntryType::Gate => "gate",
            EntryType::Batch => "batch",
            EntryType::Dump => "dump",
            EntryType::Graphql => "graphql",
        }
    }

    /// Whether `resolvedAt` triage applies to this kind
    #[inline]
    pub const fn is_resolvable(&self) -> bool {
        matches!(self, EntryType::Exception)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown entry kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntryType(pub String);

impl fmt::Display for UnknownEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entry type: {}", self.0)
    }
}

impl std::error::Error for UnknownEntryType {}

impl FromStr for EntryType {
    type Err = UnknownEntryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Dashboard sections use plural names ("requests", "queries", "batches")
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let mut candidates = vec![normalized.clone()];
        if let Some(stem) = normalized.strip_suffix("ies") {
            candidates.push(format!("{stem}y"));
        }
        if let Some(stem) = normalized.strip_suffix("es") {
            candidates.push(stem.to_string());
        }
        if let Some(stem) = normalized.strip_suffix('s') {
            candidates.push(stem.to_string());
        }

        candidates
            .iter()
            .find_map(|c| EntryType::ALL.iter().find(|t| t.as_str() == c))
            .copied()
            .ok_or_else(|| UnknownEntryType(s.to_string()))
    }
}

/// A persisted observation
///
/// Immutable after insertion except for `tags` and `resolved_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub sequence: Sequence,
    pub payload: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub resolved_at: Option<OffsetDateTime>,
}

impl Entry {
    /// Read a payload field by JSON pointer (`/status`)
    #[inline]
    pub fn field(&self, pointer: &str) -> Option<&Value> {
        self.payload.pointer(pointer)
    }

    /// Payload `status` as a string, if present
    pub fn status(&self) -> Option<String> {
        self.field("/status").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// An observation accepted by the collector, awaiting its storage id
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub sequence: Sequence,
    pub payload: Value,
    pub created_at: OffsetDateTime,
    pub request_id: Option<RequestId>,
    pub tags: BTreeSet<String>,
}

impl NewEntry {
    /// Attach the storage id, producing the persisted entry
    pub fn into_entry(self, id: EntryId) -> Entry {
        Entry {
            id,
            entry_type: self.entry_type,
            sequence: self.sequence,
            payload: self.payload,
            created_at: self.created_at,
            request_id: self.request_id,
            tags: self.tags,
            resolved_at: None,
        }
    }
}
