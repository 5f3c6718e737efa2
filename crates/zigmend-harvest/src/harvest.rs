//! The concurrent harvest phase
//!
//! All configured sources are fetched concurrently under a bounded worker
//! cap. A failing fetch never cancels its siblings; cancellation abandons
//! in-flight fetches and returns whatever already resolved.

use crate::client::{RawPayload, SourceClient};
use crate::source::SourceSpec;
use std::sync::Arc;
use tokio::sync::{watch, RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use zigmend_core::{PayloadCache, RunMetrics};

/// Maximum number of concurrent source fetches
const MAX_FETCH_WORKERS: usize = 8;

/// Result of the harvest phase
#[derive(Debug)]
pub struct HarvestOutcome {
    /// Resolved payloads, sorted by source name
    pub payloads: Vec<(SourceSpec, RawPayload)>,
    /// True when the run was cancelled mid-harvest
    pub cancelled: bool,
}

/// Fetch all sources concurrently, falling back to cached payloads.
///
/// Worker cap is `min(source_count, 8)`. Each fetch has its own timeout
/// (from its spec). On cancellation, in-flight fetches are abandoned and
/// already-resolved payloads are returned so partial results are never
/// silently lost.
pub async fn harvest(
    sources: Vec<SourceSpec>,
    cache: Arc<RwLock<PayloadCache>>,
    metrics: Arc<RunMetrics>,
    cancel: watch::Receiver<bool>,
) -> HarvestOutcome {
    let worker_cap = sources.len().min(MAX_FETCH_WORKERS).max(1);
    let permits = Arc::new(Semaphore::new(worker_cap));
    let client = Arc::new(match SourceClient::new() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client, harvest yields nothing");
            return HarvestOutcome {
                payloads: Vec::new(),
                cancelled: false,
            };
        }
    });

    info!(
        sources = sources.len(),
        workers = worker_cap,
        "Starting harvest"
    );

    let mut tasks = JoinSet::new();
    for spec in sources {
        let permits = permits.clone();
        let client = client.clone();
        let cache = cache.clone();
        let metrics = metrics.clone();

        tasks.spawn(async move {
            // Semaphore is never closed while tasks run.
            let _permit = permits.acquire().await.ok()?;
            let payload = client.resolve(&spec, &cache, &metrics).await?;
            Some((spec, payload))
        });
    }

    let mut payloads = Vec::new();
    let mut cancelled = false;
    let mut cancel = cancel;
    // Stop polling the cancel channel once its sender is gone.
    let mut cancel_open = true;

    loop {
        tokio::select! {
            biased;
            changed = cancel.wait_for(|c| *c), if cancel_open => {
                match changed {
                    Ok(_) => {
                        warn!(in_flight = tasks.len(), "Harvest cancelled, abandoning in-flight fetches");
                        tasks.abort_all();
                        cancelled = true;
                        break;
                    }
                    Err(_) => cancel_open = false,
                }
            }
            joined = tasks.join_next() => {
                match joined {
                    Some(Ok(Some(resolved))) => payloads.push(resolved),
                    Some(Ok(None)) => {}
                    Some(Err(e)) => {
                        if !e.is_cancelled() {
                            warn!(error = %e, "Fetch task panicked");
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Deterministic order for the downstream normalize pass.
    payloads.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

    debug!(
        resolved = payloads.len(),
        cancelled = cancelled,
        "Harvest complete"
    );

    HarvestOutcome {
        payloads,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ParserKind;
    use tempfile::TempDir;

    fn spec(name: &str) -> SourceSpec {
        SourceSpec {
            name: name.to_string(),
            // Connection refused immediately; exercises the fallback path.
            url: "http://127.0.0.1:1/devices.json".to_string(),
            parser: ParserKind::Herdsman,
            timeout_ms: 200,
        }
    }

    #[tokio::test]
    async fn test_all_sources_down_no_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(RwLock::new(
            PayloadCache::new(temp_dir.path().to_path_buf()).unwrap(),
        ));
        let metrics = Arc::new(RunMetrics::new());
        let (_tx, rx) = watch::channel(false);

        let outcome = harvest(
            vec![spec("a"), spec("b"), spec("c")],
            cache,
            metrics.clone(),
            rx,
        )
        .await;

        assert!(outcome.payloads.is_empty());
        assert!(!outcome.cancelled);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sources_fetched, 0);
        assert_eq!(snapshot.sources_fallback, 0);
    }

    #[tokio::test]
    async fn test_cached_sources_survive_outage() {
        let temp_dir = TempDir::new().unwrap();
        let mut payload_cache = PayloadCache::new(temp_dir.path().to_path_buf()).unwrap();
        payload_cache
            .put("b", "http://127.0.0.1:1/devices.json", b"{\"devices\":[]}")
            .unwrap();
        let cache = Arc::new(RwLock::new(payload_cache));
        let metrics = Arc::new(RunMetrics::new());
        let (_tx, rx) = watch::channel(false);

        let outcome = harvest(vec![spec("a"), spec("b")], cache, metrics.clone(), rx).await;

        assert_eq!(outcome.payloads.len(), 1);
        assert_eq!(outcome.payloads[0].0.name, "b");
        assert_eq!(metrics.snapshot().sources_fallback, 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_harvest_reports_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(RwLock::new(
            PayloadCache::new(temp_dir.path().to_path_buf()).unwrap(),
        ));
        let metrics = Arc::new(RunMetrics::new());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let outcome = harvest(vec![spec("a")], cache, metrics, rx).await;
        assert!(outcome.cancelled);
    }
}
