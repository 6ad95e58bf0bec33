/*!
 * HTTP Handlers
 * Entries API route handlers
 */

use super::error::ApiError;
use super::params;
use crate::entries::{Entry, Sequence};
use crate::query::{CursorPage, CursorPaginator};
use crate::store::{RecorderStore, SharedStore};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use time::OffsetDateTime;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub paginator: CursorPaginator<dyn RecorderStore>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self {
            paginator: CursorPaginator::new(store.clone()),
            store,
        }
    }
}

/// `{ data: T }` envelope
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct TagsBody {
    pub tags: Vec<String>,
}

type QueryPairs = Query<Vec<(String, String)>>;

/// Handle GET /entries/cursor
pub async fn handle_cursor(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<CursorPage>, ApiError> {
    let request = params::cursor_request(&pairs)?;
    Ok(Json(state.paginator.page(&request).await?))
}

/// Handle GET /entries/latest-sequence
pub async fn handle_latest_sequence(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<Data<Option<Sequence>>>, ApiError> {
    let entry_type = params::entry_type(&pairs)?;
    let data = state.paginator.latest_sequence(entry_type).await?;
    Ok(Json(Data { data }))
}

/// Handle GET /entries/check-new
pub async fn handle_check_new(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Result<Json<Data<Value>>, ApiError> {
    let entry_type = params::entry_type(&pairs)?;
    let after = params::after_sequence(&pairs)?;
    let count = state.paginator.check_new(after, entry_type).await?;
    Ok(Json(Data {
        data: json!({ "count": count }),
    }))
}

/// Handle DELETE /entries
pub async fn handle_clear(State(state): State<AppState>) -> Result<Json<Data<Value>>, ApiError> {
    let deleted = state.store.clear().await?;
    info!(deleted, "Captured entries cleared");
    Ok(Json(Data {
        data: json!({ "deleted": deleted }),
    }))
}

/// Handle PATCH /entries/:id/resolve
pub async fn handle_resolve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Data<Entry>>, ApiError> {
    let entry = state.store.set_resolved(&id, Some(OffsetDateTime::now_utc())).await?;
    Ok(Json(Data { data: entry }))
}

/// Handle PATCH /entries/:id/unresolve
pub async fn handle_unresolve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Data<Entry>>, ApiError> {
    let entry = state.store.set_resolved(&id, None).await?;
    Ok(Json(Data { data: entry }))
}

/// Handle POST /tags/entry/:id
pub async fn handle_add_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TagsBody>,
) -> Result<Json<Data<BTreeSet<String>>>, ApiError> {
    let data = state.store.add_tags(&id, &body.tags).await?;
    Ok(Json(Data { data }))
}

/// Handle DELETE /tags/entry/:id
pub async fn handle_remove_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TagsBody>,
) -> Result<Json<Data<BTreeSet<String>>>, ApiError> {
    let data = state.store.remove_tags(&id, &body.tags).await?;
    Ok(Json(Data { data }))
}

/// Handle GET /-/healthy
pub async fn handle_healthy() -> &'static str {
    "OK"
}
