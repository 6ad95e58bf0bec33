/*!
 * Live Tail Tests
 * Consumer state transitions against local and remote sources
 */

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telltale::tail::{MemorySettings, SettingsStore};
use telltale::{
    CursorPage, CursorRequest, EntryType, HttpTailSource, LocalTailSource, Recorder,
    RecorderConfig, Sequence, TailConsumer, TailError, TailOptions, TailPoller, TailSource,
};

/// Wraps a source, counting probes and optionally failing every call
struct Probe {
    inner: Arc<dyn TailSource>,
    latest_calls: AtomicUsize,
    check_calls: AtomicUsize,
    failing: AtomicBool,
}

impl Probe {
    fn new(inner: Arc<dyn TailSource>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            latest_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        })
    }

    fn fail_if_set(&self) -> Result<(), TailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TailError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TailSource for Probe {
    async fn page(&self, request: &CursorRequest) -> Result<CursorPage, TailError> {
        self.fail_if_set()?;
        self.inner.page(request).await
    }

    async fn latest_sequence(&self, entry_type: Option<EntryType>) -> Result<Option<Sequence>, TailError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_if_set()?;
        self.inner.latest_sequence(entry_type).await
    }

    async fn check_new(&self, after: Sequence, entry_type: Option<EntryType>) -> Result<u64, TailError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.fail_if_set()?;
        self.inner.check_new(after, entry_type).await
    }
}

async fn recorder() -> Recorder {
    Recorder::builder(RecorderConfig::default()).build().await.unwrap()
}

fn request_options(limit: usize) -> TailOptions {
    TailOptions {
        limit,
        ..TailOptions::for_type(EntryType::Request)
    }
}

async fn collect_requests(recorder: &Recorder, n: usize) {
    for i in 0..n {
        recorder
            .collector()
            .collect(EntryType::Request, json!({ "path": format!("/{i}"), "status": 200 }));
    }
    recorder.flush().await.unwrap();
}

#[tokio::test]
async fn test_cold_start_never_calls_check_new() {
    let recorder = recorder().await;
    let probe = Probe::new(Arc::new(LocalTailSource::new(Arc::clone(recorder.store()))));
    let consumer = TailConsumer::new(probe.clone(), Arc::new(MemorySettings::new()), request_options(10));

    assert_eq!(consumer.check_new().await.unwrap(), Some(0));

    collect_requests(&recorder, 1).await;
    assert_eq!(consumer.check_new().await.unwrap(), Some(1));

    assert_eq!(probe.latest_calls.load(Ordering::SeqCst), 2);
    assert_eq!(probe.check_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_manual_mode_counts_and_auto_mode_loads() {
    let recorder = recorder().await;
    collect_requests(&recorder, 3).await;
    let consumer = recorder.tail(Arc::new(MemorySettings::new()), request_options(2));

    assert_eq!(consumer.refresh().await.unwrap(), Some(2));
    let state = consumer.state();
    assert_eq!(state.newest_sequence, Some(3));
    assert_eq!(state.oldest_sequence, Some(2));
    assert!(state.has_more);

    collect_requests(&recorder, 5).await;
    consumer.tick().await;
    assert_eq!(consumer.state().new_count, 5);
    assert_eq!(consumer.state().entries.len(), 2);

    consumer.set_auto_refresh(true);
    consumer.tick().await;
    let state = consumer.state();
    assert_eq!(state.new_count, 0);
    assert_eq!(state.newest_sequence, Some(8));
    let sequences: Vec<Sequence> = state.entries.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![8, 7, 6, 5, 4, 3, 2]);

    assert_eq!(consumer.load_more().await.unwrap(), Some(1));
    assert_eq!(consumer.state().oldest_sequence, Some(1));
    assert!(!consumer.state().has_more);
}

#[tokio::test]
async fn test_failed_cycle_keeps_previous_view() {
    let recorder = recorder().await;
    collect_requests(&recorder, 2).await;
    let probe = Probe::new(Arc::new(LocalTailSource::new(Arc::clone(recorder.store()))));
    let consumer = TailConsumer::new(probe.clone(), Arc::new(MemorySettings::new()), request_options(10));
    consumer.refresh().await.unwrap();

    probe.failing.store(true, Ordering::SeqCst);
    consumer.tick().await;
    let state = consumer.state();
    assert_eq!(state.entries.len(), 2);
    assert_eq!(state.last_error.as_deref(), Some("Transport error: connection refused"));

    probe.failing.store(false, Ordering::SeqCst);
    consumer.set_auto_refresh(true);
    collect_requests(&recorder, 1).await;
    consumer.tick().await;
    assert_eq!(consumer.state().entries.len(), 3);
    assert!(consumer.state().last_error.is_none());
}

#[tokio::test]
async fn test_auto_refresh_setting_namespaced_by_installation() {
    let settings = Arc::new(MemorySettings::new());
    let config = RecorderConfig::default().with_installation_id("shop-eu");
    let recorder = Recorder::builder(config).build().await.unwrap();

    let consumer = recorder.tail(settings.clone(), TailOptions::default());
    consumer.set_auto_refresh(true);
    assert_eq!(settings.get_bool("shop-eu:auto-refresh").unwrap(), Some(true));
}

#[tokio::test]
async fn test_http_source_tails_remote_recorder() {
    let recorder = recorder().await;
    collect_requests(&recorder, 4).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = recorder.router();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let source = Arc::new(HttpTailSource::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap());
    assert_eq!(source.latest_sequence(Some(EntryType::Request)).await.unwrap(), Some(4));
    assert_eq!(source.check_new(1, Some(EntryType::Request)).await.unwrap(), 3);

    let consumer = TailConsumer::new(source.clone(), Arc::new(MemorySettings::new()), request_options(3));
    assert_eq!(consumer.refresh().await.unwrap(), Some(3));
    assert_eq!(consumer.state().total, 4);

    let invalid = source
        .page(&CursorRequest::new().before(3).after(1))
        .await
        .unwrap_err();
    assert!(invalid.to_string().contains("HTTP 400"));
}

#[tokio::test]
async fn test_unreachable_remote_is_an_error() {
    let source = HttpTailSource::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    assert!(matches!(
        source.latest_sequence(None).await,
        Err(TailError::Transport(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_poller_ticks_until_stopped() {
    let recorder = recorder().await;
    collect_requests(&recorder, 1).await;
    let probe = Probe::new(Arc::new(LocalTailSource::new(Arc::clone(recorder.store()))));
    let consumer = Arc::new(TailConsumer::new(
        probe.clone(),
        Arc::new(MemorySettings::new()),
        request_options(10),
    ));

    let poller = TailPoller::spawn(Arc::clone(&consumer), Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(15_500)).await;
    poller.stop().await;
    let probes = probe.latest_calls.load(Ordering::SeqCst);
    assert_eq!(probes, 3);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(probe.latest_calls.load(Ordering::SeqCst), probes);
    assert_eq!(consumer.state().new_count, 1);
}
