/*!
 * Transparency Tests
 * Wrapped operations return, fail and panic exactly like the original
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use telltale::extract::Fields;
use telltale::watchers::Settled;
use telltale::{Collector, Entry, EntryStore, EntryType, Instrument, MemoryStore, RecorderConfig};
use telltale::store::{SequenceBound, StorageFilters, StoreQuery};

async fn setup(entry_type: EntryType) -> (Arc<MemoryStore>, Collector, Instrument) {
    let store = Arc::new(MemoryStore::new());
    let config = RecorderConfig::default();
    let collector = Collector::spawn(Arc::clone(&store), &config).await;
    let instrument = Instrument::new(collector.clone(), entry_type, &config);
    (store, collector, instrument)
}

async fn entries(store: &MemoryStore, collector: &Collector) -> Vec<Entry> {
    collector.flush().await.unwrap();
    let page = store
        .query(&StoreQuery {
            entry_type: None,
            bound: SequenceBound::Latest,
            limit: 500,
            filters: StorageFilters::new(),
        })
        .await
        .unwrap();
    page.entries.into_iter().rev().collect()
}

fn no_fields<T, E>(_: &Settled<'_, T, E>) -> Result<Fields, telltale::ExtractError> {
    Ok(Fields::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sync_results_pass_through(value in any::<i64>(), message in "[a-z ]{0,24}", fail in any::<bool>()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (_store, _collector, instrument) = runtime.block_on(setup(EntryType::Command));

        let original = || -> Result<i64, String> {
            if fail { Err(message.clone()) } else { Ok(value) }
        };
        let wrapped = instrument.call(original, no_fields);
        prop_assert_eq!(wrapped, original());
    }
}

#[tokio::test]
async fn test_async_success_and_failure_pass_through() {
    let (store, collector, instrument) = setup(EntryType::Command).await;

    let ok: Result<Vec<u8>, std::io::Error> =
        instrument.call_async(async { Ok(vec![1, 2, 3]) }, no_fields).await;
    assert_eq!(ok.unwrap(), vec![1, 2, 3]);

    let err: Result<(), std::io::Error> = instrument
        .call_async(
            async { Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")) },
            no_fields,
        )
        .await;
    let err = err.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    assert_eq!(err.to_string(), "gone");

    let recorded = entries(&store, &collector).await;
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].payload["status"], json!("completed"));
    assert_eq!(recorded[1].payload["status"], json!("failed"));
    assert_eq!(recorded[1].payload["error"], json!("gone"));
}

#[tokio::test]
async fn test_panic_resumes_with_original_payload() {
    let (store, collector, instrument) = setup(EntryType::Command).await;

    let caught = catch_unwind(AssertUnwindSafe(|| {
        instrument.call(|| -> Result<(), String> { panic!("exploded") }, no_fields)
    }));
    let payload = caught.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"exploded"));

    let recorded = entries(&store, &collector).await;
    assert_eq!(recorded[0].payload["status"], json!("failed"));
    assert_eq!(recorded[0].payload["error"], json!("panicked: exploded"));
}

#[tokio::test]
async fn test_dropped_future_recorded_as_cancelled() {
    let (store, collector, instrument) = setup(EntryType::HttpClient).await;

    let slow = instrument.call_async(
        async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        },
        no_fields,
    );
    assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());

    let recorded = entries(&store, &collector).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].payload["error"], json!("cancelled"));
}

#[tokio::test]
async fn test_extractor_failure_never_reaches_caller() {
    let (store, collector, instrument) = setup(EntryType::View).await;

    let result = instrument.call(
        || Ok::<_, String>("html"),
        |_| -> Result<Fields, telltale::ExtractError> { panic!("bad extractor") },
    );
    assert_eq!(result, Ok("html"));

    let recorded = entries(&store, &collector).await;
    assert_eq!(recorded[0].payload["status"], json!("completed"));
    assert!(recorded[0].payload.get("_error").is_some());
    assert!(recorded[0].payload.get("duration").is_some());
}

#[tokio::test]
async fn test_disabled_kind_records_nothing() {
    let store = Arc::new(MemoryStore::new());
    let config = RecorderConfig::default().with_watcher(EntryType::Command, false);
    let collector = Collector::spawn(Arc::clone(&store), &config).await;
    let instrument = Instrument::new(collector.clone(), EntryType::Command, &config);

    assert_eq!(instrument.call(|| Ok::<_, String>(5), no_fields), Ok(5));
    assert!(entries(&store, &collector).await.is_empty());
}
