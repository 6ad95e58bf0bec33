/*!
 * Storage Field Table
 * Resolves a storage-level filter key to the entry field it reads
 */

use std::borrow::Cow;

/// Universal key: entry carries any of the listed tags
pub const TAGS_KEY: &str = "tags";

/// Universal key: case-insensitive substring of the serialized payload
pub const SEARCH_KEY: &str = "search";

/// Matches the request correlation id
pub const REQUEST_IDS_KEY: &str = "requestIds";

/// Where a storage key reads its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Tags,
    Search,
    RequestId,
    /// JSON pointer into the payload
    Payload(Cow<'static, str>),
}

static PAYLOAD_FIELDS: &[(&str, &str)] = &[
    ("statuses", "/status"),
    ("methods", "/method"),
    ("queryStatuses", "/status"),
    ("queryOperations", "/operation"),
    ("exceptionClasses", "/class"),
    ("levels", "/level"),
    ("cacheOperations", "/operation"),
    ("eventNames", "/name"),
    ("jobStatuses", "/status"),
    ("queues", "/queue"),
    ("scheduleStatuses", "/status"),
    ("mailStatuses", "/status"),
    ("httpClientStatuses", "/status"),
    ("httpClientMethods", "/method"),
    ("redisStatuses", "/status"),
    ("redisCommands", "/command"),
    ("modelActions", "/action"),
    ("notificationStatuses", "/status"),
    ("channels", "/channel"),
    ("viewStatuses", "/status"),
    ("viewFormats", "/format"),
    ("commandStatuses", "/status"),
    ("gateResults", "/result"),
    ("batchStatuses", "/status"),
    ("dumpStatuses", "/status"),
    ("graphqlStatuses", "/status"),
    ("graphqlOperations", "/operation"),
];

/// Resolve a storage key; unknown keys read the payload field of the same name
pub fn field_source(key: &str) -> FieldSource {
    match key {
        TAGS_KEY => FieldSource::Tags,
        SEARCH_KEY => FieldSource::Search,
        REQUEST_IDS_KEY => FieldSource::RequestId,
        _ => PAYLOAD_FIELDS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, pointer)| FieldSource::Payload(Cow::Borrowed(*pointer)))
            .unwrap_or_else(|| FieldSource::Payload(Cow::Owned(format!("/{key}")))),
    }
}

/// Whether `key` has an explicit field mapping
pub fn is_known_key(key: &str) -> bool {
    matches!(key, TAGS_KEY | SEARCH_KEY | REQUEST_IDS_KEY)
        || PAYLOAD_FIELDS.iter().any(|(k, _)| *k == key)
}
