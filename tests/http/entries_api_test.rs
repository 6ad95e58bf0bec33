/*!
 * Entries API Tests
 * Router behavior driven through `oneshot` requests
 */

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use telltale::{EntryStore, EntryType, MemoryStore, NewEntry, SharedStore};
use time::OffsetDateTime;
use tower::ServiceExt;

async fn seed(store: &MemoryStore, sequence: u64, entry_type: EntryType, payload: Value) -> String {
    store
        .insert(NewEntry {
            entry_type,
            sequence,
            payload,
            created_at: OffsetDateTime::now_utc(),
            request_id: None,
            tags: BTreeSet::new(),
        })
        .await
        .unwrap()
        .id
}

/// Three requests, one exception, one log
async fn fixture() -> (Router, Arc<MemoryStore>, String, String) {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 1, EntryType::Request, json!({ "status": 200, "method": "GET" })).await;
    seed(&store, 2, EntryType::Request, json!({ "status": 500, "method": "POST" })).await;
    let exception = seed(&store, 3, EntryType::Exception, json!({ "class": "Timeout" })).await;
    seed(&store, 4, EntryType::Request, json!({ "status": 200, "method": "POST" })).await;
    let log = seed(&store, 5, EntryType::Log, json!({ "level": "info" })).await;

    let shared: SharedStore = store.clone();
    (telltale::http::router(shared), store, exception, log)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

fn sequences(page: &Value) -> Vec<u64> {
    page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["sequence"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_cursor_with_filters() {
    let (app, ..) = fixture().await;

    let (status, page) = send(&app, Method::GET, "/entries/cursor?type=request&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sequences(&page), vec![4, 2]);
    assert_eq!(
        page["meta"],
        json!({ "hasMore": true, "oldestSequence": 2, "newestSequence": 4, "total": 3 })
    );

    let (_, page) = send(&app, Method::GET, "/entries/cursor?type=request&statuses=200", None).await;
    assert_eq!(sequences(&page), vec![4, 1]);

    let (_, page) = send(
        &app,
        Method::GET,
        "/entries/cursor?type=request&statuses=200,500&methods=POST",
        None,
    )
    .await;
    assert_eq!(sequences(&page), vec![4, 2]);

    let (_, page) = send(&app, Method::GET, "/entries/cursor?beforeSequence=3&limit=", None).await;
    assert_eq!(sequences(&page), vec![2, 1]);
}

#[tokio::test]
async fn test_latest_sequence_and_check_new() {
    let (app, ..) = fixture().await;

    let (_, body) = send(&app, Method::GET, "/entries/latest-sequence?type=request", None).await;
    assert_eq!(body, json!({ "data": 4 }));

    let (_, body) = send(&app, Method::GET, "/entries/latest-sequence?type=mail", None).await;
    assert_eq!(body, json!({ "data": null }));

    let (_, body) = send(&app, Method::GET, "/entries/check-new?afterSequence=1", None).await;
    assert_eq!(body, json!({ "data": { "count": 4 } }));

    let (status, body) = send(&app, Method::GET, "/entries/check-new?type=request", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!("error"));
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (app, ..) = fixture().await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/entries/cursor?beforeSequence=4&afterSequence=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!("error"));
    assert!(!body["message"].as_str().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/entries/cursor?type=telepathy", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/entries/cursor?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resolve_and_unresolve() {
    let (app, _, exception, log) = fixture().await;

    let (status, body) = send(&app, Method::PATCH, &format!("/entries/{exception}/resolve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(exception));
    assert!(body["data"]["resolvedAt"].is_string());

    let (status, body) = send(&app, Method::PATCH, &format!("/entries/{exception}/unresolve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("resolvedAt").is_none());

    let (status, _) = send(&app, Method::PATCH, &format!("/entries/{log}/resolve"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::PATCH, "/entries/missing/resolve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], json!("error"));
}

#[tokio::test]
async fn test_tags_round_trip_through_filters() {
    let (app, _, exception, _) = fixture().await;
    let uri = format!("/tags/entry/{exception}");

    let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "tags": ["urgent", "db"] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": ["db", "urgent"] }));

    let (_, page) = send(&app, Method::GET, "/entries/cursor?tags=urgent", None).await;
    assert_eq!(sequences(&page), vec![3]);

    let (_, body) = send(&app, Method::DELETE, &uri, Some(json!({ "tags": ["urgent"] }))).await;
    assert_eq!(body, json!({ "data": ["db"] }));

    let (_, page) = send(&app, Method::GET, "/entries/cursor?tags=urgent", None).await;
    assert_eq!(sequences(&page), Vec::<u64>::new());
}

#[tokio::test]
async fn test_clear_and_health() {
    let (app, store, ..) = fixture().await;

    let (status, body) = send(&app, Method::DELETE, "/entries", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "deleted": 5 } }));
    assert_eq!(store.latest_sequence(None).await.unwrap(), None);

    let (status, body) = send(&app, Method::GET, "/-/healthy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}
