//! Per-run counters shared across pipeline stages
//!
//! [`RunMetrics`] is created once per orchestrator run and passed by
//! reference into every stage; the fetch phase runs concurrently, so the
//! counters are atomics. A [`MetricsSnapshot`] freezes the values for the
//! final report.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for a single run. Never a global: the
/// orchestrator owns the instance and hands out references.
#[derive(Debug, Default)]
pub struct RunMetrics {
    sources_fetched: AtomicU64,
    sources_fallback: AtomicU64,
    normalize_skipped: AtomicU64,
    merge_records_in: AtomicU64,
    merge_records_out: AtomicU64,
    remediation_applied: AtomicU64,
    validation_issues_fixed: AtomicU64,
    validation_issues_remaining: AtomicU64,
    validation_unparsed_lines: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_sources_fetched(&self) {
        self.sources_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_sources_fallback(&self) {
        self.sources_fallback.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_normalize_skipped(&self, count: u64) {
        self.normalize_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_merge_counts(&self, records_in: u64, records_out: u64) {
        self.merge_records_in.store(records_in, Ordering::Relaxed);
        self.merge_records_out.store(records_out, Ordering::Relaxed);
    }

    pub fn add_remediation_applied(&self, count: u64) {
        self.remediation_applied.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_issues_fixed(&self, count: u64) {
        self.validation_issues_fixed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn set_issues_remaining(&self, count: u64) {
        self.validation_issues_remaining
            .store(count, Ordering::Relaxed);
    }

    pub fn add_unparsed_lines(&self, count: u64) {
        self.validation_unparsed_lines
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Freeze the current counter values for serialization.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sources_fetched: self.sources_fetched.load(Ordering::Relaxed),
            sources_fallback: self.sources_fallback.load(Ordering::Relaxed),
            normalize_skipped: self.normalize_skipped.load(Ordering::Relaxed),
            merge_records_in: self.merge_records_in.load(Ordering::Relaxed),
            merge_records_out: self.merge_records_out.load(Ordering::Relaxed),
            remediation_applied: self.remediation_applied.load(Ordering::Relaxed),
            validation_issues_fixed: self.validation_issues_fixed.load(Ordering::Relaxed),
            validation_issues_remaining: self.validation_issues_remaining.load(Ordering::Relaxed),
            validation_unparsed_lines: self.validation_unparsed_lines.load(Ordering::Relaxed),
        }
    }
}

/// Frozen counter values, serialized into the run report with the
/// stage-grouped dotted names used throughout the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(rename = "sources.fetched")]
    pub sources_fetched: u64,
    #[serde(rename = "sources.fallback")]
    pub sources_fallback: u64,
    #[serde(rename = "normalize.skipped")]
    pub normalize_skipped: u64,
    #[serde(rename = "merge.recordsIn")]
    pub merge_records_in: u64,
    #[serde(rename = "merge.recordsOut")]
    pub merge_records_out: u64,
    #[serde(rename = "remediation.applied")]
    pub remediation_applied: u64,
    #[serde(rename = "validation.issuesFixed")]
    pub validation_issues_fixed: u64,
    #[serde(rename = "validation.issuesRemaining")]
    pub validation_issues_remaining: u64,
    #[serde(rename = "validation.unparsedLines")]
    pub validation_unparsed_lines: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = RunMetrics::new();
        metrics.incr_sources_fetched();
        metrics.incr_sources_fetched();
        metrics.incr_sources_fallback();
        metrics.add_normalize_skipped(3);
        metrics.set_merge_counts(10, 7);
        metrics.add_issues_fixed(2);
        metrics.set_issues_remaining(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sources_fetched, 2);
        assert_eq!(snapshot.sources_fallback, 1);
        assert_eq!(snapshot.normalize_skipped, 3);
        assert_eq!(snapshot.merge_records_in, 10);
        assert_eq!(snapshot.merge_records_out, 7);
        assert_eq!(snapshot.validation_issues_fixed, 2);
        assert_eq!(snapshot.validation_issues_remaining, 1);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = std::sync::Arc::new(RunMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let metrics = metrics.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    metrics.incr_sources_fetched();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().sources_fetched, 8000);
    }

    #[test]
    fn test_snapshot_serializes_dotted_names() {
        let json = serde_json::to_string(&RunMetrics::new().snapshot()).unwrap();
        assert!(json.contains("\"sources.fetched\""));
        assert!(json.contains("\"merge.recordsOut\""));
        assert!(json.contains("\"validation.issuesRemaining\""));
    }
}
