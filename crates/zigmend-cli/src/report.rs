//! Run report serialization and human-readable summary

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use zigmend_core::{MergedRecord, MetricsSnapshot, ValidationIssue};
use zigmend_registry::CoverageReport;

/// Final state of one orchestrator run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub metrics: MetricsSnapshot,
    pub coverage: CoverageReport,
    pub remaining_issues: Vec<ValidationIssue>,
    pub merged_records: Vec<MergedRecord>,
    pub cancelled: bool,
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    /// Whether the run should exit with status 0.
    pub fn success(&self) -> bool {
        self.remaining_issues.is_empty() && !self.cancelled
    }

    /// Write the JSON report to a fixed path, overwriting the previous
    /// run's report, plus a text summary alongside it.
    pub fn write(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating report directory {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(self).context("serializing run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;

        let summary_path = path.with_extension("txt");
        std::fs::write(&summary_path, self.summary())
            .with_context(|| format!("writing summary to {}", summary_path.display()))?;

        info!(report = %path.display(), summary = %summary_path.display(), "Report written");
        Ok(summary_path)
    }

    /// Derived human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("zigmend run summary\n");
        out.push_str("===================\n\n");

        out.push_str(&format!(
            "Sources: {} fetched, {} from cache fallback\n",
            self.metrics.sources_fetched, self.metrics.sources_fallback
        ));
        out.push_str(&format!(
            "Records: {} in, {} merged, {} skipped during normalization\n",
            self.metrics.merge_records_in,
            self.metrics.merge_records_out,
            self.metrics.normalize_skipped
        ));
        out.push_str(&format!(
            "Coverage: {} covered, {} partial, {} uncovered\n",
            self.coverage.covered.len(),
            self.coverage.partially_covered.len(),
            self.coverage.uncovered.len()
        ));
        out.push_str(&format!(
            "Remediation: {} transformations applied, {} issues fixed\n",
            self.metrics.remediation_applied, self.metrics.validation_issues_fixed
        ));
        out.push_str(&format!(
            "Remaining issues: {}\n",
            self.remaining_issues.len()
        ));

        if !self.remaining_issues.is_empty() {
            out.push('\n');
            for issue in &self.remaining_issues {
                out.push_str(&format!("  - {}\n", issue));
            }
        }

        if self.cancelled {
            out.push_str("\nRun was cancelled; results are partial.\n");
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zigmend_core::{IssueCode, RunMetrics};

    fn report(remaining: Vec<ValidationIssue>, cancelled: bool) -> RunReport {
        RunReport {
            metrics: RunMetrics::new().snapshot(),
            coverage: CoverageReport::default(),
            remaining_issues: remaining,
            merged_records: Vec::new(),
            cancelled,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_success_requires_clean_and_uncancelled() {
        assert!(report(Vec::new(), false).success());
        assert!(!report(Vec::new(), true).success());
        let issue = ValidationIssue::new(IssueCode::Unknown, "e1", "problem");
        assert!(!report(vec![issue], false).success());
    }

    #[test]
    fn test_write_overwrites_previous_report() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");

        report(Vec::new(), false).write(&path).unwrap();
        let issue = ValidationIssue::new(IssueCode::MissingField, "e1", "Missing name");
        report(vec![issue], false).write(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let reloaded: RunReport = serde_json::from_str(&content).unwrap();
        assert_eq!(reloaded.remaining_issues.len(), 1);

        let summary = std::fs::read_to_string(temp_dir.path().join("report.txt")).unwrap();
        assert!(summary.contains("Remaining issues: 1"));
        assert!(summary.contains("Missing name"));
    }

    #[test]
    fn test_summary_mentions_cancellation() {
        let summary = report(Vec::new(), true).summary();
        assert!(summary.contains("cancelled"));
    }
}
