/*!
 * Mail Watcher
 * Records messages dispatched through the host mailer
 */

use super::facility::Facility;
use super::installed::{install_facility, InstalledSet};
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{MailPayload, ToPayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    pub to: Vec<String>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub mailer: Option<String>,
}

/// Host mail transport capability
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()>;
}

struct WatchedMailer {
    inner: Arc<dyn Mailer>,
    instrument: Instrument,
}

#[async_trait]
impl Mailer for WatchedMailer {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        self.instrument
            .call_async(self.inner.send(mail), |_| {
                MailPayload {
                    to: mail.to.clone(),
                    subject: mail.subject.clone(),
                    mailer: mail.mailer.clone(),
                }
                .to_fields()
            })
            .await
    }
}

pub struct MailWatcher {
    instrument: Instrument,
    installed: InstalledSet,
}

impl MailWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Mail, config),
            installed: InstalledSet::new(),
        }
    }

    pub fn install(&self, facility: Option<&Facility<dyn Mailer>>) -> bool {
        install_facility(&self.instrument, &self.installed, facility, "send", |inner, instrument| {
            Arc::new(WatchedMailer { inner, instrument })
        })
    }
}
