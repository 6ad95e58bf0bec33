/*!
 * Query Parameters
 * Decodes the entries API query string into cursor requests
 *
 * `type`, `limit`, `beforeSequence` and `afterSequence` are reserved; every
 * other key is a storage filter key whose values are comma separated. The
 * `search` value is taken whole.
 */

use crate::core::errors::QueryError;
use crate::entries::{EntryType, Sequence};
use crate::query::CursorRequest;
use crate::store::{FilterValue, StorageFilters, SEARCH_KEY};

const TYPE_PARAM: &str = "type";
const LIMIT_PARAM: &str = "limit";
const BEFORE_PARAM: &str = "beforeSequence";
const AFTER_PARAM: &str = "afterSequence";

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, QueryError> {
    raw.trim().parse().map_err(|_| QueryError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected a non-negative integer, got {raw:?}"),
    })
}

fn filter_value(raw: &str) -> FilterValue {
    match raw.parse::<i64>() {
        Ok(n) => FilterValue::Number(n),
        Err(_) => FilterValue::Text(raw.to_string()),
    }
}

/// Optional `type` parameter
pub fn entry_type(pairs: &[(String, String)]) -> Result<Option<EntryType>, QueryError> {
    match pairs.iter().find(|(k, v)| k == TYPE_PARAM && !v.is_empty()) {
        Some((_, raw)) => raw
            .parse()
            .map(Some)
            .map_err(|_| QueryError::UnknownEntryType(raw.clone())),
        None => Ok(None),
    }
}

/// Required `afterSequence` parameter
pub fn after_sequence(pairs: &[(String, String)]) -> Result<Sequence, QueryError> {
    match pairs.iter().find(|(k, _)| k == AFTER_PARAM) {
        Some((_, raw)) => parse_number(AFTER_PARAM, raw),
        None => Err(QueryError::InvalidParameter {
            name: AFTER_PARAM.to_string(),
            reason: "required".to_string(),
        }),
    }
}

/// Full cursor request; empty values are treated as absent
pub fn cursor_request(pairs: &[(String, String)]) -> Result<CursorRequest, QueryError> {
    let mut request = CursorRequest::new();
    request.entry_type = entry_type(pairs)?;
    let mut filters = StorageFilters::new();

    for (key, raw) in pairs.iter().filter(|(_, v)| !v.trim().is_empty()) {
        match key.as_str() {
            TYPE_PARAM => {}
            LIMIT_PARAM => {
                request.limit = Some(parse_number(LIMIT_PARAM, raw).map_err(|_| {
                    QueryError::InvalidLimit(format!("{raw:?} is not a positive integer"))
                })?)
            }
            BEFORE_PARAM => request.before_sequence = Some(parse_number(BEFORE_PARAM, raw)?),
            AFTER_PARAM => request.after_sequence = Some(parse_number(AFTER_PARAM, raw)?),
            SEARCH_KEY => filters.extend(SEARCH_KEY, [FilterValue::Text(raw.trim().to_string())]),
            other => filters.extend(
                other,
                raw.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(filter_value),
            ),
        }
    }

    Ok(request.filters(filters))
}
