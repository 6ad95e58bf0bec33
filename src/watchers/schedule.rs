/*!
 * Schedule Watcher
 * Instruments named scheduled tasks discovered from the host scheduler
 *
 * Each run moves Idle -> Started -> Completed | Failed -> Idle. A `started`
 * entry is emitted fire-and-forget when the run begins; the settled entry
 * carries the duration and, when known, the next scheduled run.
 */

use super::facility::{FacilityId, FacilityMap};
use super::installed::InstalledSet;
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::core::errors::DiscoveryError;
use crate::entries::EntryType;
use crate::extract::{SchedulePayload, ToPayload};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// A scheduled task the host registers with its scheduler
#[async_trait]
pub trait Schedulable: Send + Sync {
    /// Cron-style expression, if the scheduler has one
    fn expression(&self) -> Option<String> {
        None
    }

    fn next_run(&self) -> Option<OffsetDateTime> {
        None
    }

    async fn run(&self) -> anyhow::Result<()>;
}

/// Host scheduler registry, enumerated at install time
pub trait ScheduleRegistry: Send + Sync {
    fn registry_id(&self) -> FacilityId;

    fn task_names(&self) -> Result<Vec<String>, DiscoveryError>;

    /// Replace `name` with `wrap(current)`; false if it vanished
    fn decorate_task(
        &self,
        name: &str,
        wrap: &mut dyn FnMut(Arc<dyn Schedulable>) -> Arc<dyn Schedulable>,
    ) -> bool;
}

impl ScheduleRegistry for FacilityMap<dyn Schedulable> {
    fn registry_id(&self) -> FacilityId {
        self.id()
    }

    fn task_names(&self) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.names())
    }

    fn decorate_task(
        &self,
        name: &str,
        wrap: &mut dyn FnMut(Arc<dyn Schedulable>) -> Arc<dyn Schedulable>,
    ) -> bool {
        self.decorate(name, wrap)
    }
}

/// Decorator installed in place of a scheduled task
struct WatchedTask {
    name: String,
    inner: Arc<dyn Schedulable>,
    instrument: Instrument,
}

#[async_trait]
impl Schedulable for WatchedTask {
    fn expression(&self) -> Option<String> {
        self.inner.expression()
    }

    fn next_run(&self) -> Option<OffsetDateTime> {
        self.inner.next_run()
    }

    async fn run(&self) -> anyhow::Result<()> {
        let expression = self.inner.expression();
        self.instrument.emit(json!({
            "name": self.name,
            "expression": expression,
            "status": "started",
        }));

        self.instrument
            .call_async(self.inner.run(), |_| {
                SchedulePayload {
                    name: self.name.clone(),
                    expression,
                    next_run: self.inner.next_run(),
                }
                .to_fields()
            })
            .await
    }
}

pub struct ScheduleWatcher {
    instrument: Instrument,
    installed: InstalledSet,
}

impl ScheduleWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Schedule, config),
            installed: InstalledSet::new(),
        }
    }

    /// Decorate every task in `registry`, returning how many were newly wrapped
    ///
    /// A missing registry or a failed enumeration installs nothing.
    pub fn install(&self, registry: Option<&dyn ScheduleRegistry>) -> usize {
        if !self.instrument.is_enabled() {
            return 0;
        }
        let Some(registry) = registry else {
            debug!("No scheduler registered, schedule watcher idle");
            return 0;
        };

        let names = match registry.task_names() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Scheduler discovery failed, schedule watcher idle");
                return 0;
            }
        };

        let id = registry.registry_id();
        let mut installed = 0;
        for name in names {
            let key = id.key(&name);
            if !self.installed.claim(key.clone()) {
                continue;
            }
            let instrument = self.instrument.clone();
            let task_name = name.clone();
            let wrapped = registry.decorate_task(&name, &mut |inner| -> Arc<dyn Schedulable> {
                Arc::new(WatchedTask {
                    name: task_name.clone(),
                    inner,
                    instrument: instrument.clone(),
                })
            });
            if wrapped {
                installed += 1;
            } else {
                // Gone since enumeration; a later install may find it again
                self.installed.release(&key);
                debug!(task = %name, "Scheduled task vanished before decoration");
            }
        }

        debug!(installed, "Schedule watcher installed");
        installed
    }
}
