/*!
 * Filter Tests
 * OR within a category, AND across categories
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use telltale::query::{apply_filters, CursorFilters, FilterKeyTable};
use telltale::{
    CursorPaginator, CursorRequest, Entry, EntryAnnotations, EntryStore, EntryType, MemoryStore,
    NewEntry,
};
use time::OffsetDateTime;

fn new_entry(sequence: u64, entry_type: EntryType, payload: serde_json::Value) -> NewEntry {
    NewEntry {
        entry_type,
        sequence,
        payload,
        created_at: OffsetDateTime::now_utc(),
        request_id: Some(format!("req-{}", sequence % 2)),
        tags: BTreeSet::new(),
    }
}

/// `(A,GET) (A,POST) (B,GET)` as http-client entries
async fn combinations() -> CursorPaginator<MemoryStore> {
    let store = MemoryStore::new();
    let rows = [(1, "A", "GET"), (2, "A", "POST"), (3, "B", "GET")];
    for (sequence, status, method) in rows {
        store
            .insert(new_entry(
                sequence,
                EntryType::HttpClient,
                json!({ "status": status, "method": method }),
            ))
            .await
            .unwrap();
    }
    CursorPaginator::new(Arc::new(store))
}

async fn matching(pager: &CursorPaginator<MemoryStore>, filters: CursorFilters) -> u64 {
    let storage = filters.resolve(Some(EntryType::HttpClient), &FilterKeyTable::new());
    let page = pager
        .page(
            &CursorRequest::new()
                .of_type(EntryType::HttpClient)
                .filters(storage),
        )
        .await
        .unwrap();
    assert_eq!(page.meta.total, page.data.len() as u64);
    page.meta.total
}

#[tokio::test]
async fn test_and_or_semantics() {
    let pager = combinations().await;

    assert_eq!(matching(&pager, CursorFilters::new().with("statuses", "A")).await, 2);
    assert_eq!(
        matching(
            &pager,
            CursorFilters::new().with("statuses", "A").with("methods", "POST")
        )
        .await,
        1
    );
    assert_eq!(
        matching(&pager, CursorFilters::new().with("statuses", "A").with("statuses", "B")).await,
        3
    );
    assert_eq!(matching(&pager, CursorFilters::new()).await, 3);
}

#[tokio::test]
async fn test_empty_category_matches_nothing() {
    let pager = combinations().await;
    let mut filters = CursorFilters::new();
    filters.set("statuses", Vec::<&str>::new());
    assert_eq!(matching(&pager, filters).await, 0);
}

#[tokio::test]
async fn test_tags_search_and_request_ids() {
    let store = Arc::new(MemoryStore::new());
    let first = store
        .insert(new_entry(1, EntryType::Exception, json!({ "class": "Timeout", "message": "Upstream slow" })))
        .await
        .unwrap();
    store
        .insert(new_entry(2, EntryType::Exception, json!({ "class": "Parse", "message": "bad json" })))
        .await
        .unwrap();
    store.add_tags(&first.id, &["urgent".to_string()]).await.unwrap();
    let pager = CursorPaginator::new(Arc::clone(&store));
    let table = FilterKeyTable::new();

    let count = |filters: CursorFilters| {
        let pager = pager.clone();
        let storage = filters.resolve(Some(EntryType::Exception), &table);
        async move {
            pager
                .page(&CursorRequest::new().of_type(EntryType::Exception).filters(storage))
                .await
                .unwrap()
                .sequences()
        }
    };

    assert_eq!(count(CursorFilters::new().with("tags", "urgent")).await, vec![1]);
    assert_eq!(count(CursorFilters::new().with("search", "UPSTREAM")).await, vec![1]);
    assert_eq!(count(CursorFilters::new().with("requestIds", "req-0")).await, vec![2]);
    assert_eq!(count(CursorFilters::new().with("classes", "parse")).await, vec![2]);
}

fn entry(sequence: u64, status: &str, queue: &str) -> Entry {
    new_entry(sequence, EntryType::Job, json!({ "status": status, "queue": queue }))
        .into_entry(sequence.to_string())
}

const STATUSES: [&str; 3] = ["completed", "failed", "pending"];
const QUEUES: [&str; 3] = ["mail", "billing", "default"];

proptest! {
    #[test]
    fn prop_filters_are_or_within_and_across(
        rows in prop::collection::vec((0usize..3, 0usize..3), 0..40),
        wanted_statuses in prop::collection::btree_set(0usize..3, 1..3),
        wanted_queues in prop::collection::btree_set(0usize..3, 1..3),
    ) {
        let entries: Vec<Entry> = rows
            .iter()
            .enumerate()
            .map(|(i, (s, q))| entry(i as u64 + 1, STATUSES[*s], QUEUES[*q]))
            .collect();

        let mut filters = CursorFilters::new();
        filters.set("statuses", wanted_statuses.iter().map(|s| STATUSES[*s]));
        filters.set("queues", wanted_queues.iter().map(|q| QUEUES[*q]));
        let storage = filters.resolve(Some(EntryType::Job), &FilterKeyTable::new());

        let kept = apply_filters(entries, &storage).len();
        let expected = rows
            .iter()
            .filter(|(s, q)| wanted_statuses.contains(s) && wanted_queues.contains(q))
            .count();
        prop_assert_eq!(kept, expected);
    }
}
