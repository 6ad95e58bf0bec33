/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::entries::{EntryId, EntryType};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entry store errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Entry {0} not found")]
    #[diagnostic(
        code(store::not_found),
        help("The entry may have been pruned or cleared. Check the entry id.")
    )]
    NotFound(EntryId),

    #[error("Sequence {0} already stored")]
    #[diagnostic(
        code(store::duplicate_sequence),
        help("Sequences are assigned by a single collector. Two collectors share this store.")
    )]
    DuplicateSequence(u64),

    #[error("Entries of type {0} cannot be resolved")]
    #[diagnostic(
        code(store::not_resolvable),
        help("Only exception entries carry triage state.")
    )]
    NotResolvable(EntryType),

    #[error("Storage backend failure: {0}")]
    #[diagnostic(
        code(store::backend),
        help("The storage engine rejected the operation. View logs for details.")
    )]
    Backend(String),
}

/// Cursor and filter query errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum QueryError {
    #[error("beforeSequence and afterSequence are mutually exclusive")]
    #[diagnostic(
        code(query::conflicting_cursors),
        help("Page older with beforeSequence or newer with afterSequence, not both.")
    )]
    ConflictingCursors,

    #[error("Invalid limit: {0}")]
    #[diagnostic(code(query::invalid_limit), help("Limit must be a positive integer."))]
    InvalidLimit(String),

    #[error("Invalid parameter {name}: {reason}")]
    #[diagnostic(code(query::invalid_parameter))]
    InvalidParameter { name: String, reason: String },

    #[error("Unknown entry type: {0}")]
    #[diagnostic(
        code(query::unknown_entry_type),
        help("Use one of request, query, exception, log, cache, event, job, schedule, mail, http-client, redis, model, notification, view, command, gate, batch, dump, graphql.")
    )]
    UnknownEntryType(String),

    #[error("Store error: {0}")]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Facility discovery failures (scheduler registry, view engine, ...)
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum DiscoveryError {
    #[error("Facility {0} is not registered")]
    #[diagnostic(code(watcher::facility_missing))]
    Missing(String),

    #[error("Enumerating {facility} failed: {reason}")]
    #[diagnostic(code(watcher::enumeration_failed))]
    Enumeration { facility: String, reason: String },
}

/// Payload extraction failures (never surfaced to the host)
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ExtractError {
    #[error("Unable to serialize")]
    #[diagnostic(code(extract::serialize))]
    Serialize(String),

    #[error("Missing field: {0}")]
    #[diagnostic(code(extract::missing_field))]
    MissingField(&'static str),

    #[error("Extractor panicked")]
    #[diagnostic(code(extract::panicked))]
    Panicked,
}

/// Persisted UI settings failures
#[derive(Error, Debug, Diagnostic)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    #[diagnostic(code(settings::io))]
    Io(#[from] std::io::Error),

    #[error("Settings file is corrupt: {0}")]
    #[diagnostic(
        code(settings::corrupt),
        help("Delete the settings file to start from defaults.")
    )]
    Corrupt(#[from] serde_json::Error),
}

/// Live-tail source failures
#[derive(Error, Debug, Diagnostic)]
pub enum TailError {
    #[error("Query error: {0}")]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error("Transport error: {0}")]
    #[diagnostic(
        code(tail::transport),
        help("The recorder endpoint is unreachable. The next poll tick retries.")
    )]
    Transport(String),

    #[error("Unexpected response: {0}")]
    #[diagnostic(code(tail::decode))]
    Decode(String),
}

impl From<reqwest::Error> for TailError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TailError::Decode(err.to_string())
        } else {
            TailError::Transport(err.to_string())
        }
    }
}

/// Configuration loading failures
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    #[diagnostic(code(config::io))]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(config::invalid),
        help("Review configuration parameters against RecorderConfig.")
    )]
    Invalid(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Unified recorder error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum RecorderError {
    #[error("Store error: {0}")]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Query error: {0}")]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    #[diagnostic(transparent)]
    Settings(#[from] SettingsError),

    #[error("Collector stopped")]
    #[diagnostic(
        code(recorder::collector_stopped),
        help("The collector worker has shut down; observations are no longer persisted.")
    )]
    CollectorStopped,

    #[error("I/O error: {0}")]
    #[diagnostic(code(recorder::io_error))]
    Io(#[from] std::io::Error),
}

/// Serializable error representation for HTTP responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Result type for recorder operations
pub type RecorderResult<T> = std::result::Result<T, RecorderError>;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;
