/*!
 * Request Context
 * Task-local correlation id for entries produced while serving one request
 */

use crate::entries::RequestId;
use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static REQUEST_ID: RequestId;
}

/// Accessors for the request-scoped correlation id
pub struct RequestContext;

impl RequestContext {
    /// Correlation id of the current task, if one is in scope
    #[inline]
    pub fn current() -> Option<RequestId> {
        REQUEST_ID.try_with(Clone::clone).ok()
    }

    /// Run `fut` with `id` in scope
    pub async fn scope<F: Future>(id: RequestId, fut: F) -> F::Output {
        REQUEST_ID.scope(id, fut).await
    }

    /// Run `f` synchronously with `id` in scope
    pub fn sync_scope<R>(id: RequestId, f: impl FnOnce() -> R) -> R {
        REQUEST_ID.sync_scope(id, f)
    }

    /// Fresh correlation id
    pub fn generate() -> RequestId {
        Uuid::new_v4().to_string()
    }
}
