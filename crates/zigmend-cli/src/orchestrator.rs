//! The orchestrator state machine
//!
//! Sequences harvest, normalize, merge, analyze, validate, remediate, and
//! report. The remediate/revalidate loop is bounded to exactly one retry:
//! the validator is never invoked more than twice per run. The run always
//! reaches Reporting unless the merge invariant itself is broken.

use crate::config::Config;
use crate::report::RunReport;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};
use zigmend_core::{
    merge, MergedRecord, PayloadCache, RegistryEntry, RunMetrics, ValidationIssue,
};
use zigmend_core::{registry::load_registry, IssueCode};
use zigmend_harvest::{harvest, normalize};
use zigmend_registry::{analyze, remediate, CoverageReport, ValidateError};

/// Pipeline states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Harvesting,
    Normalizing,
    Merging,
    Analyzing,
    Validating,
    Remediating,
    Revalidating,
    Reporting,
    Done,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Harvesting => "harvesting",
            RunState::Normalizing => "normalizing",
            RunState::Merging => "merging",
            RunState::Analyzing => "analyzing",
            RunState::Validating => "validating",
            RunState::Remediating => "remediating",
            RunState::Revalidating => "revalidating",
            RunState::Reporting => "reporting",
            RunState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Owns one run's lifecycle and exit status
pub struct Orchestrator {
    config: Config,
    cancel: watch::Receiver<bool>,
}

impl Orchestrator {
    pub fn new(config: Config, cancel: watch::Receiver<bool>) -> Self {
        Self { config, cancel }
    }

    fn enter(&self, state: RunState) {
        info!(state = %state, "Pipeline stage");
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Run the whole pipeline and write the report.
    ///
    /// The only early exit is a broken merge invariant; every other
    /// failure mode degrades into report content.
    pub async fn run(&self) -> Result<RunReport> {
        let metrics = Arc::new(RunMetrics::new());

        // Harvesting
        self.enter(RunState::Harvesting);
        let cache_dir = PathBuf::from(&self.config.harvest.cache_dir);
        let cache = PayloadCache::new(cache_dir)
            .with_context(|| format!("opening payload cache at {}", self.config.harvest.cache_dir))?;
        let cache = Arc::new(RwLock::new(cache));

        let outcome = harvest(
            self.config.sources.clone(),
            cache,
            metrics.clone(),
            self.cancel.clone(),
        )
        .await;
        let mut cancelled = outcome.cancelled;

        // Normalizing
        let mut records = Vec::new();
        if !cancelled {
            self.enter(RunState::Normalizing);
            for (spec, payload) in &outcome.payloads {
                let batch = normalize(&spec.name, spec.parser, &payload.bytes, payload.fetched_at);
                metrics.add_normalize_skipped(batch.skipped);
                records.extend(batch.records);
            }
            cancelled = self.is_cancelled();
        }

        // Merging - the one stage whose failure aborts the run.
        let mut merged: Vec<MergedRecord> = Vec::new();
        if !cancelled {
            self.enter(RunState::Merging);
            let records_in = records.len() as u64;
            merged = merge(records).context("merge invariant violated")?;
            metrics.set_merge_counts(records_in, merged.len() as u64);
            cancelled = self.is_cancelled();
        }

        // Analyzing
        let registry_dir = PathBuf::from(&self.config.registry.path);
        let mut registry: Vec<RegistryEntry> = Vec::new();
        let mut coverage = CoverageReport::default();
        if !cancelled {
            self.enter(RunState::Analyzing);
            registry = match load_registry(&registry_dir) {
                Ok(registry) => registry,
                Err(e) => {
                    warn!(dir = %registry_dir.display(), error = %e, "Registry unreadable, analyzing nothing");
                    Vec::new()
                }
            };
            coverage = analyze(&registry, &merged);
            cancelled = self.is_cancelled();
        }

        // Validating / Remediating / Revalidating
        let mut remaining: Vec<ValidationIssue> = Vec::new();
        if !cancelled {
            self.enter(RunState::Validating);
            remaining = self
                .validate_and_remediate(&registry, &registry_dir, &metrics)
                .await;
            cancelled = self.is_cancelled();
        }

        // Reporting
        self.enter(RunState::Reporting);
        metrics.set_issues_remaining(remaining.len() as u64);

        let report = RunReport {
            metrics: metrics.snapshot(),
            coverage,
            remaining_issues: remaining,
            merged_records: merged,
            cancelled,
            generated_at: Utc::now(),
        };
        report.write(&PathBuf::from(&self.config.report.path))?;

        self.enter(RunState::Done);
        Ok(report)
    }

    /// First validation, at most one remediation pass, and the bounded
    /// revalidation. Returns the issues left for the report.
    async fn validate_and_remediate(
        &self,
        registry: &[RegistryEntry],
        registry_dir: &Path,
        metrics: &RunMetrics,
    ) -> Vec<ValidationIssue> {
        let first = match self.config.validator.validate(registry_dir).await {
            Ok(outcome) => outcome,
            Err(ValidateError::Spawn { program, source }) => {
                warn!(program = %program, error = %source, "Validator unavailable");
                return vec![ValidationIssue::registry_wide(
                    IssueCode::Unknown,
                    &format!("validator '{}' could not be spawned: {}", program, source),
                )];
            }
        };
        metrics.add_unparsed_lines(first.unparsed_lines);

        if !first.diagnostics_available {
            // Timed out: nothing was diagnosed, so there is nothing safe
            // to remediate this round.
            return first.issues;
        }
        if first.issues.is_empty() {
            return Vec::new();
        }

        // Remediating
        self.enter(RunState::Remediating);
        let first_count = first.issues.len();
        let mut by_entry: HashMap<String, Vec<ValidationIssue>> = HashMap::new();
        let mut unresolved = Vec::new();
        for issue in first.issues {
            if issue.entry_id == "*" {
                unresolved.push(issue);
            } else {
                by_entry.entry(issue.entry_id.clone()).or_default().push(issue);
            }
        }

        for entry in registry {
            let Some(entry_issues) = by_entry.remove(&entry.id) else {
                continue;
            };

            let outcome = remediate(entry, &entry_issues);
            metrics.add_remediation_applied(outcome.fixed.len() as u64);
            unresolved.extend(outcome.unresolved);

            if outcome.entry != *entry {
                if let Err(e) = outcome.entry.save(registry_dir) {
                    // The fix never reached disk; its issues are still open.
                    warn!(entry = %entry.id, error = %e, "Failed to write remediated entry");
                    unresolved.extend(outcome.fixed);
                }
            }
        }

        // Issues naming entries the registry does not contain cannot be
        // remediated here.
        for (_, issues) in by_entry {
            unresolved.extend(issues);
        }

        if self.is_cancelled() {
            return unresolved;
        }

        // Revalidating - the single bounded retry.
        self.enter(RunState::Revalidating);
        let remaining = match self.config.validator.validate(registry_dir).await {
            Ok(outcome) => {
                metrics.add_unparsed_lines(outcome.unparsed_lines);
                outcome.issues
            }
            Err(ValidateError::Spawn { program, source }) => {
                warn!(program = %program, error = %source, "Validator unavailable on revalidation");
                vec![ValidationIssue::registry_wide(
                    IssueCode::Unknown,
                    &format!("revalidation failed to spawn '{}': {}", program, source),
                )]
            }
        };

        metrics.add_issues_fixed(first_count.saturating_sub(remaining.len()) as u64);
        remaining
    }
}
