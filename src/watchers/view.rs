/*!
 * View Watcher
 * Records template renders through the host view engine
 */

use super::facility::Facility;
use super::installed::{install_facility, InstalledSet};
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{CallShape, ToPayload, ViewPayload};
use std::sync::Arc;

/// Host view engine capability
pub trait Renderable: Send + Sync {
    fn render(&self, call: &CallShape) -> anyhow::Result<String>;
}

struct WatchedRenderer {
    inner: Arc<dyn Renderable>,
    instrument: Instrument,
}

impl Renderable for WatchedRenderer {
    fn render(&self, call: &CallShape) -> anyhow::Result<String> {
        self.instrument.call(
            || self.inner.render(call),
            |settled| {
                ViewPayload {
                    name: call.name().to_string(),
                    format: call.format().map(str::to_string),
                    data: call.data().and_then(|data| self.instrument.capture().capture(data)),
                    size: settled.outcome.value().map(String::len),
                }
                .to_fields()
            },
        )
    }
}

pub struct ViewWatcher {
    instrument: Instrument,
    installed: InstalledSet,
}

impl ViewWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::View, config),
            installed: InstalledSet::new(),
        }
    }

    pub fn install(&self, facility: Option<&Facility<dyn Renderable>>) -> bool {
        install_facility(&self.instrument, &self.installed, facility, "render", |inner, instrument| {
            Arc::new(WatchedRenderer { inner, instrument })
        })
    }
}
