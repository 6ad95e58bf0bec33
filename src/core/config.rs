/*!
 * Recorder Configuration
 *
 * Constructed once at process start and shared by reference with the
 * collector, watchers and live-tail consumers
 */

use super::errors::ConfigError;
use super::limits::{COLLECTOR_QUEUE_CAPACITY, DATA_SIZE_LIMIT, SLOW_QUERY_MS, TAIL_POLL_INTERVAL};
use crate::entries::EntryType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// What the collector does when its queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the observation being offered
    #[default]
    DropNewest,
    /// Evict the oldest pending observation to make room
    DropOldest,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_newest" | "drop-newest" | "newest" => Ok(OverflowPolicy::DropNewest),
            "drop_oldest" | "drop-oldest" | "oldest" => Ok(OverflowPolicy::DropOldest),
            other => Err(ConfigError::Invalid(format!("unknown overflow policy: {other}"))),
        }
    }
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Master switch; a disabled recorder installs no watchers
    pub enabled: bool,
    /// Capture caller-supplied data (template data, job data, bindings, ...)
    pub capture_data: bool,
    /// Serialized size above which captured data is replaced by a marker
    pub data_size_limit: usize,
    /// Pending observations the collector buffers before applying `overflow`
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    /// Query duration (ms) at or above which a query is flagged slow
    pub slow_query_ms: u64,
    /// Per-type watcher switches; absent types are enabled
    pub watchers: BTreeMap<EntryType, bool>,
    /// Namespaces persisted UI settings
    pub installation_id: String,
    pub poll_interval_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_data: false,
            data_size_limit: DATA_SIZE_LIMIT,
            queue_capacity: COLLECTOR_QUEUE_CAPACITY,
            overflow: OverflowPolicy::DropNewest,
            slow_query_ms: SLOW_QUERY_MS,
            watchers: BTreeMap::new(),
            installation_id: "default".to_string(),
            poll_interval_ms: TAIL_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl RecorderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TELLTALE_*` environment overrides
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = var("TELLTALE_ENABLED") {
            self.enabled = parse_bool("TELLTALE_ENABLED", &v)?;
        }
        if let Some(v) = var("TELLTALE_CAPTURE_DATA") {
            self.capture_data = parse_bool("TELLTALE_CAPTURE_DATA", &v)?;
        }
        if let Some(v) = var("TELLTALE_QUEUE_CAPACITY") {
            self.queue_capacity = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("TELLTALE_QUEUE_CAPACITY={v}")))?;
        }
        if let Some(v) = var("TELLTALE_OVERFLOW") {
            self.overflow = v.parse()?;
        }
        if let Some(v) = var("TELLTALE_SLOW_QUERY_MS") {
            self.slow_query_ms = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("TELLTALE_SLOW_QUERY_MS={v}")))?;
        }
        if let Some(v) = var("TELLTALE_DISABLED_WATCHERS") {
            for name in v.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let entry_type: EntryType = name
                    .parse()
                    .map_err(|e: crate::entries::UnknownEntryType| ConfigError::Invalid(e.to_string()))?;
                self.watchers.insert(entry_type, false);
            }
        }
        if let Some(v) = var("TELLTALE_INSTALLATION_ID") {
            self.installation_id = v;
        }

        self.validate()?;
        debug!(config = ?self, "Recorder configuration resolved");
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Whether the watcher for `entry_type` should install
    #[inline]
    pub fn watcher_enabled(&self, entry_type: EntryType) -> bool {
        self.enabled && self.watchers.get(&entry_type).copied().unwrap_or(true)
    }

    pub fn with_capture_data(mut self, capture: bool) -> Self {
        self.capture_data = capture;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_watcher(mut self, entry_type: EntryType, enabled: bool) -> Self {
        self.watchers.insert(entry_type, enabled);
        self
    }

    pub fn with_installation_id(mut self, id: impl Into<String>) -> Self {
        self.installation_id = id.into();
        self
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{name}={value}"))),
    }
}
