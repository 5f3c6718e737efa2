//! HTTP source client with timeout, typed errors, and cache fallback

use crate::source::SourceSpec;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use zigmend_core::{PayloadCache, RunMetrics};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
}

/// Raw bytes fetched from a source, plus the detected content type.
///
/// Malformed body content is not an error at this layer; deciding whether
/// the bytes parse is the normalizer's job.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    /// When the bytes were actually fetched; for a cache fallback this is
    /// the original fetch time, not now
    pub fetched_at: DateTime<Utc>,
}

/// Fetches one source's payload over HTTP
pub struct SourceClient {
    client: reqwest::Client,
}

impl SourceClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetch a source's payload with the source's own timeout.
    pub async fn fetch(&self, spec: &SourceSpec) -> Result<RawPayload, FetchError> {
        let response = self
            .client
            .get(&spec.url)
            .timeout(Duration::from_millis(spec.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(spec.timeout_ms)
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(spec.timeout_ms)
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        Ok(RawPayload {
            bytes: bytes.to_vec(),
            content_type,
            fetched_at: Utc::now(),
        })
    }

    /// Fetch with fallback: the single policy point deciding between live
    /// data and the last-known-good cache.
    ///
    /// On success the payload is written to the cache (keyed by source
    /// name) and `sources.fetched` is incremented. On failure the cache is
    /// consulted; a hit increments `sources.fallback`, a miss means the
    /// source contributes nothing this run.
    pub async fn resolve(
        &self,
        spec: &SourceSpec,
        cache: &RwLock<PayloadCache>,
        metrics: &RunMetrics,
    ) -> Option<RawPayload> {
        match self.fetch(spec).await {
            Ok(payload) => {
                metrics.incr_sources_fetched();
                info!(source = %spec.name, bytes = payload.bytes.len(), "Fetched source payload");

                let mut cache = cache.write().await;
                if let Err(e) = cache.put(&spec.name, &spec.url, &payload.bytes) {
                    warn!(source = %spec.name, error = %e, "Failed to cache payload");
                }

                Some(payload)
            }
            Err(e) => {
                warn!(source = %spec.name, error = %e, "Fetch failed, trying cache fallback");

                let cache = cache.read().await;
                match cache.get(&spec.name) {
                    Some(bytes) => {
                        metrics.incr_sources_fallback();
                        info!(source = %spec.name, "Using last-known-good cached payload");
                        let fetched_at = cache
                            .entry(&spec.name)
                            .map(|e| e.fetched_at)
                            .unwrap_or_else(Utc::now);
                        Some(RawPayload {
                            bytes,
                            content_type: None,
                            fetched_at,
                        })
                    }
                    None => {
                        warn!(source = %spec.name, "No cached payload, source contributes nothing this run");
                        None
                    }
                }
            }
        }
    }
}
