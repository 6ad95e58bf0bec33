/*!
 * Tail Sources
 * Where a live-tail consumer reads pages and sequence probes from
 */

use crate::core::errors::{ErrorBody, TailError};
use crate::entries::{EntryType, Sequence};
use crate::query::{CursorPage, CursorPaginator, CursorRequest};
use crate::store::EntryStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Read side of the entries API
#[async_trait]
pub trait TailSource: Send + Sync {
    async fn page(&self, request: &CursorRequest) -> Result<CursorPage, TailError>;

    async fn latest_sequence(&self, entry_type: Option<EntryType>) -> Result<Option<Sequence>, TailError>;

    async fn check_new(&self, after: Sequence, entry_type: Option<EntryType>) -> Result<u64, TailError>;
}

/// In-process source over a store
pub struct LocalTailSource<S: ?Sized> {
    paginator: CursorPaginator<S>,
}

impl<S> LocalTailSource<S>
where
    S: EntryStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            paginator: CursorPaginator::new(store),
        }
    }
}

#[async_trait]
impl<S> TailSource for LocalTailSource<S>
where
    S: EntryStore + ?Sized + 'static,
{
    async fn page(&self, request: &CursorRequest) -> Result<CursorPage, TailError> {
        Ok(self.paginator.page(request).await?)
    }

    async fn latest_sequence(&self, entry_type: Option<EntryType>) -> Result<Option<Sequence>, TailError> {
        Ok(self.paginator.latest_sequence(entry_type).await?)
    }

    async fn check_new(&self, after: Sequence, entry_type: Option<EntryType>) -> Result<u64, TailError> {
        Ok(self.paginator.check_new(after, entry_type).await?)
    }
}

#[derive(Deserialize)]
struct DataBody<T> {
    data: T,
}

#[derive(Deserialize)]
struct CountBody {
    count: u64,
}

/// Remote source speaking the recorder's HTTP surface
#[derive(Clone)]
pub struct HttpTailSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTailSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TailError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T, TailError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(TailError::Transport(format!("HTTP {}: {}", status.as_u16(), message)));
        }
        Ok(response.json::<T>().await?)
    }
}

fn type_param(entry_type: Option<EntryType>) -> Vec<(String, String)> {
    entry_type
        .map(|t| vec![("type".to_string(), t.as_str().to_string())])
        .unwrap_or_default()
}

/// Query pairs for a cursor request
pub fn cursor_query(request: &CursorRequest) -> Vec<(String, String)> {
    let mut pairs = type_param(request.entry_type);
    if let Some(limit) = request.limit {
        pairs.push(("limit".into(), limit.to_string()));
    }
    if let Some(before) = request.before_sequence {
        pairs.push(("beforeSequence".into(), before.to_string()));
    }
    if let Some(after) = request.after_sequence {
        pairs.push(("afterSequence".into(), after.to_string()));
    }
    pairs.extend(request.filters.to_query_pairs());
    pairs
}

#[async_trait]
impl TailSource for HttpTailSource {
    async fn page(&self, request: &CursorRequest) -> Result<CursorPage, TailError> {
        self.get("/entries/cursor", &cursor_query(request)).await
    }

    async fn latest_sequence(&self, entry_type: Option<EntryType>) -> Result<Option<Sequence>, TailError> {
        let body: DataBody<Option<Sequence>> =
            self.get("/entries/latest-sequence", &type_param(entry_type)).await?;
        Ok(body.data)
    }

    async fn check_new(&self, after: Sequence, entry_type: Option<EntryType>) -> Result<u64, TailError> {
        let mut query = type_param(entry_type);
        query.push(("afterSequence".into(), after.to_string()));
        let body: DataBody<CountBody> = self.get("/entries/check-new", &query).await?;
        Ok(body.data.count)
    }
}
