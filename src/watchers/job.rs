/*!
 * Job Watcher
 * Records each queued job the host worker processes
 */

use super::facility::Facility;
use super::installed::{install_facility, InstalledSet};
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{JobPayload, ToPayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A dequeued job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub queue: String,
    #[serde(default = "first_attempt")]
    pub attempt: u32,
    #[serde(default)]
    pub data: Value,
}

fn first_attempt() -> u32 {
    1
}

impl Job {
    pub fn new(name: impl Into<String>, queue: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            attempt: 1,
            data,
        }
    }
}

/// Host job processing capability
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: &Job) -> anyhow::Result<()>;
}

struct WatchedProcessor {
    inner: Arc<dyn JobProcessor>,
    instrument: Instrument,
}

#[async_trait]
impl JobProcessor for WatchedProcessor {
    async fn process(&self, job: &Job) -> anyhow::Result<()> {
        self.instrument
            .call_async(self.inner.process(job), |_| {
                JobPayload {
                    name: job.name.clone(),
                    queue: job.queue.clone(),
                    attempt: job.attempt,
                    data: self.instrument.capture().capture(&job.data),
                }
                .to_fields()
            })
            .await
    }
}

pub struct JobWatcher {
    instrument: Instrument,
    installed: InstalledSet,
}

impl JobWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Job, config),
            installed: InstalledSet::new(),
        }
    }

    pub fn install(&self, facility: Option<&Facility<dyn JobProcessor>>) -> bool {
        install_facility(&self.instrument, &self.installed, facility, "process", |inner, instrument| {
            Arc::new(WatchedProcessor { inner, instrument })
        })
    }
}
