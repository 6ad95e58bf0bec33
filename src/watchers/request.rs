/*!
 * Request Watcher
 * Tower layer that correlates and records inbound HTTP requests
 *
 * Every request runs inside a `RequestContext` scope, so entries recorded
 * by other watchers while it is served carry the same `requestId`.
 */

use super::instrument::Instrument;
use crate::collector::{Collector, RequestContext};
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{RequestPayload, ToPayload};
use axum::http::{Request, Response};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Inbound header honoured as the correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layer that wraps services with request recording
#[derive(Clone)]
pub struct RequestWatchLayer {
    instrument: Instrument,
}

impl RequestWatchLayer {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::Request, config),
        }
    }
}

impl<S> Layer<S> for RequestWatchLayer {
    type Service = RequestWatchService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestWatchService {
            inner,
            instrument: self.instrument.clone(),
        }
    }
}

/// Service that records each request it forwards
#[derive(Clone)]
pub struct RequestWatchService<S> {
    inner: S,
    instrument: Instrument,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestWatchService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Display + Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(RequestContext::generate);
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let user_agent = request
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let instrument = self.instrument.clone();
        // The clone that was driven to readiness serves this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let future = RequestContext::sync_scope(request_id.clone(), || inner.call(request));

        Box::pin(RequestContext::scope(request_id, async move {
            instrument
                .call_async(future, |settled| {
                    RequestPayload {
                        method,
                        path,
                        // 500 when the inner service errored without a response
                        status: settled
                            .outcome
                            .value()
                            .map_or(500, |response| response.status().as_u16()),
                        user_agent,
                    }
                    .to_fields()
                })
                .await
        }))
    }
}
