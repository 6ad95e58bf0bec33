/*!
 * HTTP Client Watcher
 * Records outbound HTTP calls made through the host transport
 */

use super::facility::Facility;
use super::installed::{install_facility, InstalledSet};
use super::instrument::Instrument;
use crate::collector::Collector;
use crate::core::config::RecorderConfig;
use crate::entries::EntryType;
use crate::extract::{HttpClientPayload, ToPayload};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response as seen by the host
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Host outbound HTTP capability
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> anyhow::Result<OutboundResponse>;
}

/// `HttpTransport` over a `reqwest` client
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> anyhow::Result<OutboundResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid method {}", request.method))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;

        Ok(OutboundResponse {
            status,
            headers,
            body,
        })
    }
}

struct WatchedTransport {
    inner: Arc<dyn HttpTransport>,
    instrument: Instrument,
}

#[async_trait]
impl HttpTransport for WatchedTransport {
    async fn send(&self, request: OutboundRequest) -> anyhow::Result<OutboundResponse> {
        let method = request.method.to_ascii_uppercase();
        let url = request.url.clone();
        let request_body = request
            .body
            .as_ref()
            .and_then(|body| self.instrument.capture().capture(body));

        self.instrument
            .call_async(self.inner.send(request), |settled| {
                let response = settled.outcome.value();
                let mut fields: Map<String, Value> = HttpClientPayload {
                    method,
                    url,
                    response_status: response.map(|r| r.status),
                    request_body,
                    response_size: response.map(|r| r.body.len()),
                }
                .to_fields()?;
                // Filterable by the response code once one exists
                if let Some(r) = response {
                    fields.insert("status".into(), Value::from(r.status));
                }
                Ok(fields)
            })
            .await
    }
}

pub struct HttpClientWatcher {
    instrument: Instrument,
    installed: InstalledSet,
}

impl HttpClientWatcher {
    pub fn new(collector: Collector, config: &RecorderConfig) -> Self {
        Self {
            instrument: Instrument::new(collector, EntryType::HttpClient, config),
            installed: InstalledSet::new(),
        }
    }

    pub fn install(&self, facility: Option<&Facility<dyn HttpTransport>>) -> bool {
        install_facility(&self.instrument, &self.installed, facility, "send", |inner, instrument| {
            Arc::new(WatchedTransport { inner, instrument })
        })
    }
}
