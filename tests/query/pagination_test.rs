/*!
 * Pagination Tests
 * Backward and forward paging visit every entry exactly once
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use telltale::{
    Collector, CursorMeta, CursorPaginator, CursorRequest, EntryStore, EntryType, MemoryStore,
    NewEntry, RecorderConfig, Sequence,
};
use time::OffsetDateTime;

async fn seed(store: &MemoryStore, entry_type: EntryType, sequences: impl IntoIterator<Item = Sequence>) {
    for sequence in sequences {
        store
            .insert(NewEntry {
                entry_type,
                sequence,
                payload: json!({ "status": "completed" }),
                created_at: OffsetDateTime::now_utc(),
                request_id: None,
                tags: BTreeSet::new(),
            })
            .await
            .unwrap();
    }
}

async fn walk_backward(pager: &CursorPaginator<MemoryStore>, entry_type: EntryType, limit: usize) -> (Vec<Sequence>, usize) {
    let mut seen = Vec::new();
    let mut pages = 0;
    let mut request = CursorRequest::new().of_type(entry_type).limit(limit);
    loop {
        let page = pager.page(&request).await.unwrap();
        pages += 1;
        seen.extend(page.sequences());
        match (page.meta.has_more, page.meta.oldest_sequence) {
            (true, Some(oldest)) => request = request.before(oldest),
            _ => break,
        }
    }
    (seen, pages)
}

#[tokio::test]
async fn test_237_entries_in_pages_of_50() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, EntryType::Query, 1..=237).await;
    let pager = CursorPaginator::new(Arc::clone(&store));

    let (seen, pages) = walk_backward(&pager, EntryType::Query, 50).await;
    let expected: Vec<Sequence> = (1..=237).rev().collect();
    assert_eq!(seen, expected);
    assert_eq!(pages, 5);
}

#[tokio::test]
async fn test_interleaved_types_page_independently() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, EntryType::Log, (1..=60).filter(|s| s % 2 == 0)).await;
    seed(&store, EntryType::Cache, (1..=60).filter(|s| s % 2 == 1)).await;
    let pager = CursorPaginator::new(Arc::clone(&store));

    let (logs, _) = walk_backward(&pager, EntryType::Log, 7).await;
    assert_eq!(logs.len(), 30);
    assert!(logs.iter().all(|s| s % 2 == 0));
    assert!(logs.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
async fn test_collected_scenario_100_99_98() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, EntryType::Dump, 1..=97).await;
    let collector = Collector::spawn(Arc::clone(&store), &RecorderConfig::default()).await;
    for path in ["/a", "/b", "/c"] {
        collector.collect(EntryType::Request, json!({ "path": path, "status": 200 }));
    }
    collector.flush().await.unwrap();
    let pager = CursorPaginator::new(Arc::clone(&store));

    let first = pager
        .page(&CursorRequest::new().of_type(EntryType::Request).limit(2))
        .await
        .unwrap();
    assert_eq!(first.sequences(), vec![100, 99]);
    assert_eq!(
        first.meta,
        CursorMeta {
            has_more: true,
            oldest_sequence: Some(99),
            newest_sequence: Some(100),
            total: 3,
        }
    );

    let second = pager
        .page(
            &CursorRequest::new()
                .of_type(EntryType::Request)
                .limit(2)
                .before(99),
        )
        .await
        .unwrap();
    assert_eq!(second.sequences(), vec![98]);
    assert!(!second.meta.has_more);
}

#[tokio::test]
async fn test_forward_paging_catches_up() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, EntryType::Mail, 1..=25).await;
    let pager = CursorPaginator::new(Arc::clone(&store));

    let mut cursor = 5;
    let mut seen = Vec::new();
    loop {
        let page = pager
            .page(&CursorRequest::new().of_type(EntryType::Mail).limit(8).after(cursor))
            .await
            .unwrap();
        let mut batch = page.sequences();
        batch.reverse();
        seen.extend(batch);
        match (page.meta.has_more, page.meta.newest_sequence) {
            (true, Some(newest)) => cursor = newest,
            _ => break,
        }
    }
    let expected: Vec<Sequence> = (6..=25).collect();
    assert_eq!(seen, expected);
    assert_eq!(pager.check_new(5, Some(EntryType::Mail)).await.unwrap(), 20);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_backward_paging_has_no_gaps(total in 0u64..180, limit in 1usize..60) {
        let (seen, _) = tokio_test::block_on(async {
            let store = Arc::new(MemoryStore::new());
            seed(&store, EntryType::Job, 1..=total).await;
            walk_backward(&CursorPaginator::new(store), EntryType::Job, limit).await
        });
        let expected: Vec<Sequence> = (1..=total).rev().collect();
        prop_assert_eq!(seen, expected);
    }
}
