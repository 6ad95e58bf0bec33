/*!
 * Query Watcher
 * Records database statements with their operation keyword and slow flag
 */

use super::facility::Facility;
use super::installed::{install_facility, InstalledSet};
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{QueryPayload, ToPayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub rows: Vec<Value>,
    pub rows_affected: u64,
}

/// Host database capability
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Value]) -> anyhow::Result<QueryOutput>;
}

const KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "UPSERT", "MERGE", "CREATE", "ALTER", "DROP",
    "TRUNCATE", "BEGIN", "COMMIT", "ROLLBACK", "WITH", "EXPLAIN",
];

/// Leading SQL keyword, uppercased; `OTHER` when unrecognised
pub fn operation_keyword(sql: &str) -> String {
    let first = sql
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    if KEYWORDS.contains(&first.as_str()) {
        first
    } else {
        "OTHER".to_string()
    }
}

struct WatchedExecutor {
    inner: Arc<dyn QueryExecutor>,
    instrument: Instrument,
    slow_query_ms: u64,
}

#[async_trait]
impl QueryExecutor for WatchedExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> anyhow::Result<QueryOutput> {
        self.instrument
            .call_async(self.inner.execute(sql, params), |settled| {
                QueryPayload {
                    sql: sql.to_string(),
                    operation: operation_keyword(sql),
                    slow: settled.duration_ms >= self.slow_query_ms as f64,
                    bindings: self.instrument.capture().capture(params),
                    row_count: settled
                        .outcome
                        .value()
                        .map(|out| out.rows.len() as u64 + out.rows_affected),
                }
                .to_fields()
            })
            .await
    }
}

pub struct QueryWatcher {
    instrument: Instrument,
    installed: InstalledSet,
    slow_query_ms: u64,
}

impl QueryWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Query, config),
            installed: InstalledSet::new(),
            slow_query_ms: config.slow_query_ms,
        }
    }

    pub fn install(&self, facility: Option<&Facility<dyn QueryExecutor>>) -> bool {
        let slow_query_ms = self.slow_query_ms;
        install_facility(&self.instrument, &self.installed, facility, "execute", |inner, instrument| {
            Arc::new(WatchedExecutor {
                inner,
                instrument,
                slow_query_ms,
            })
        })
    }
}
