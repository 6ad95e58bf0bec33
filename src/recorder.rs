/*!
 * Recorder
 * Wires configuration, store, collector and watchers into one handle
 */

use crate::collector::{Collector, CollectorStats};
use crate::core::config::RecorderConfig;
use crate::core::errors::RecorderResult;
use crate::entries::EntryType;
use crate::query::CursorPaginator;
use crate::store::{MemoryStore, RecorderStore, SharedStore};
use crate::tail::{LocalTailSource, SettingsStore, TailConsumer, TailOptions, TailPoller};
use crate::watchers::{
    CacheWatcher, ExceptionReporter, HttpClientWatcher, JobWatcher, LogWatchLayer, MailWatcher,
    OperationWatcher, QueryWatcher, RequestWatchLayer, ScheduleWatcher, ViewWatcher,
};
use axum::Router;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;

/// Builder for `Recorder`
pub struct RecorderBuilder {
    config: RecorderConfig,
    store: Option<SharedStore>,
}

impl RecorderBuilder {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config, store: None }
    }

    /// Use `store` instead of a fresh in-memory store
    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and start the collector
    pub async fn build(self) -> RecorderResult<Recorder> {
        self.config.validate()?;
        let config = Arc::new(self.config);
        let store = self
            .store
            .unwrap_or_else(|| -> SharedStore { Arc::new(MemoryStore::new()) });
        let collector = Collector::spawn(Arc::clone(&store), &config).await;

        let watchers = Watchers::new(&collector, &config);
        info!(
            enabled = config.enabled,
            capture_data = config.capture_data,
            "Recorder started"
        );

        Ok(Recorder {
            config,
            store,
            collector,
            watchers: Arc::new(watchers),
        })
    }
}

/// One instance of every specialized watcher
pub struct Watchers {
    pub schedule: ScheduleWatcher,
    pub job: JobWatcher,
    pub view: ViewWatcher,
    pub cache: CacheWatcher,
    pub query: QueryWatcher,
    pub http_client: HttpClientWatcher,
    pub mail: MailWatcher,
    pub exception: ExceptionReporter,
}

impl Watchers {
    fn new(collector: &Collector, config: &RecorderConfig) -> Self {
        Self {
            schedule: ScheduleWatcher::new(collector.clone(), config),
            job: JobWatcher::new(collector.clone(), config),
            view: ViewWatcher::new(collector.clone(), config),
            cache: CacheWatcher::new(collector.clone(), config),
            query: QueryWatcher::new(collector.clone(), config),
            http_client: HttpClientWatcher::new(collector.clone(), config),
            mail: MailWatcher::new(collector.clone(), config),
            exception: ExceptionReporter::new(collector.clone(), config),
        }
    }
}

/// Cheaply cloneable recorder handle
#[derive(Clone)]
pub struct Recorder {
    config: Arc<RecorderConfig>,
    store: SharedStore,
    collector: Collector,
    watchers: Arc<Watchers>,
}

impl Recorder {
    pub fn builder(config: RecorderConfig) -> RecorderBuilder {
        RecorderBuilder::new(config)
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn watchers(&self) -> &Watchers {
        &self.watchers
    }

    pub fn paginator(&self) -> CursorPaginator<dyn RecorderStore> {
        CursorPaginator::new(Arc::clone(&self.store))
    }

    /// Tower layer recording inbound requests of the host router
    pub fn request_layer(&self) -> RequestWatchLayer {
        RequestWatchLayer::new(self.collector.clone(), &self.config)
    }

    /// `tracing` layer recording host log events
    pub fn log_layer(&self) -> LogWatchLayer {
        LogWatchLayer::new(self.collector.clone(), &self.config)
    }

    /// Watcher for kinds recorded through explicit calls (event, gate, command, ...)
    pub fn operation(&self, entry_type: EntryType) -> OperationWatcher {
        OperationWatcher::new(self.collector.clone(), entry_type, &self.config)
    }

    /// Entries API router over this recorder's store
    pub fn router(&self) -> Router {
        crate::http::router(Arc::clone(&self.store))
    }

    /// Live-tail consumer reading this recorder's store in-process
    pub fn tail(&self, settings: Arc<dyn SettingsStore>, mut options: TailOptions) -> TailConsumer {
        options.installation_id = self.config.installation_id.clone();
        let source = Arc::new(LocalTailSource::new(Arc::clone(&self.store)));
        TailConsumer::new(source, settings, options)
    }

    /// Live-tail consumer polled every `poll_interval_ms`
    pub fn spawn_tail(
        &self,
        settings: Arc<dyn SettingsStore>,
        options: TailOptions,
    ) -> (Arc<TailConsumer>, TailPoller) {
        let consumer = Arc::new(self.tail(settings, options));
        let poller = TailPoller::spawn(Arc::clone(&consumer), self.config.poll_interval());
        (consumer, poller)
    }

    pub fn stats(&self) -> CollectorStats {
        self.collector.stats()
    }

    /// Delete entries created before `older_than`
    pub async fn prune(&self, older_than: OffsetDateTime) -> RecorderResult<u64> {
        let removed = self.store.prune(older_than).await?;
        info!(removed, "Pruned old entries");
        Ok(removed)
    }

    /// Wait until every accepted observation is persisted
    pub async fn flush(&self) -> RecorderResult<()> {
        self.collector.flush().await
    }
}
