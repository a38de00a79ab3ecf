// src/ingest/providers/clerk_http.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use crate::ingest::config::IngestConfig;
use crate::ingest::decode::decode_document;
use crate::ingest::error::IngestError;
use crate::ingest::types::{record_url, Presence, RecordSource};
use crate::vote::VoteRecord;

/// Record source backed by the chamber clerk's per-vote XML endpoint.
pub struct ClerkHttpSource {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl ClerkHttpSource {
    pub fn from_config(cfg: &IngestConfig) -> Result<Self, IngestError> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| IngestError::transport(cfg.base_url.clone(), e))?;
        Ok(Self {
            base_url: cfg.base_url.clone(),
            client,
            timeout: Duration::from_secs(cfg.request_timeout_secs),
        })
    }

    pub fn url_for(&self, year: u16, sequence: u32) -> String {
        record_url(&self.base_url, year, sequence)
    }
}

/// The source answers missing rolls with a 200 HTML page rather than a 404.
fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false)
}

fn presence_from(status: StatusCode, content_type: Option<&str>) -> Option<Presence> {
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Some(Presence::Absent);
    }
    if !status.is_success() {
        return None;
    }
    if is_html(content_type) {
        Some(Presence::Absent)
    } else {
        Some(Presence::Exists)
    }
}

fn status_error(status: StatusCode) -> std::io::Error {
    std::io::Error::other(format!("unexpected HTTP status {status}"))
}

#[async_trait]
impl RecordSource for ClerkHttpSource {
    async fn probe(&self, year: u16, sequence: u32) -> Result<Presence, IngestError> {
        let url = self.url_for(year, sequence);
        let resp = self
            .client
            .head(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IngestError::transport(url.clone(), e))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let presence = presence_from(status, content_type)
            .ok_or_else(|| IngestError::transport(url.clone(), status_error(status)))?;

        tracing::trace!(target: "ingest", %url, ?presence, "probe");
        Ok(presence)
    }

    async fn fetch(&self, year: u16, sequence: u32) -> Result<VoteRecord, IngestError> {
        let url = self.url_for(year, sequence);
        let t0 = Instant::now();
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IngestError::transport(url.clone(), e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::transport(url, status_error(status)));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| IngestError::transport(url.clone(), e))?;

        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        decode_document(year, sequence, &body)
    }

    fn name(&self) -> &'static str {
        "clerk-http"
    }
}
