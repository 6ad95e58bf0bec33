/*!
 * Cache Watcher
 * Records hits, misses, writes and deletes against the host cache
 */

use super::facility::Facility;
use super::installed::{install_facility, InstalledSet};
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{CachePayload, ToPayload};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Host cache capability
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> anyhow::Result<()>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;
}

struct WatchedCache {
    inner: Arc<dyn CacheStore>,
    instrument: Instrument,
}

#[async_trait]
impl CacheStore for WatchedCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        self.instrument
            .call_async(self.inner.get(key), |settled| {
                let hit = settled.outcome.value().map(Option::is_some);
                CachePayload {
                    operation: match hit {
                        Some(true) => "hit",
                        Some(false) => "miss",
                        None => "get",
                    },
                    key: key.to_string(),
                    hit,
                    value: None,
                    ttl_seconds: None,
                }
                .to_fields()
            })
            .await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> anyhow::Result<()> {
        let captured = self.instrument.capture().capture(&value);
        self.instrument
            .call_async(self.inner.set(key, value, ttl), |_| {
                CachePayload {
                    operation: "set",
                    key: key.to_string(),
                    hit: None,
                    value: captured,
                    ttl_seconds: ttl.map(|t| t.as_secs()),
                }
                .to_fields()
            })
            .await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        self.instrument
            .call_async(self.inner.delete(key), |_| {
                CachePayload {
                    operation: "delete",
                    key: key.to_string(),
                    hit: None,
                    value: None,
                    ttl_seconds: None,
                }
                .to_fields()
            })
            .await
    }
}

pub struct CacheWatcher {
    instrument: Instrument,
    installed: InstalledSet,
}

impl CacheWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Cache, config),
            installed: InstalledSet::new(),
        }
    }

    pub fn install(&self, facility: Option<&Facility<dyn CacheStore>>) -> bool {
        install_facility(&self.instrument, &self.installed, facility, "cache", |inner, instrument| {
            Arc::new(WatchedCache { inner, instrument })
        })
    }
}
