//! Registry coverage analysis
//!
//! Classifies merged device records against the local registry: covered,
//! partially covered (entry exists but misses capabilities or clusters),
//! or uncovered. Read-only; uncovered records carry a suggested entry
//! skeleton for the external driver-templating tool.

use crate::clusters::cluster_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use zigmend_core::{ClusterRef, MergedRecord, RegistryEntry};

/// A covered record whose entry is missing some of the record's features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCoverage {
    pub canonical_key: String,
    pub entry_id: String,
    pub missing_capabilities: BTreeSet<String>,
    pub missing_clusters: BTreeSet<String>,
}

/// Suggested skeleton for a driver entry that does not exist yet.
/// Suggestion only: creating registry entries is the templating
/// collaborator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySuggestion {
    pub canonical_key: String,
    pub suggested_id: String,
    pub manufacturer_id: String,
    pub product_id: String,
    pub capabilities: BTreeSet<String>,
    pub clusters: BTreeSet<String>,
}

/// Classification of merged records against the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Canonical keys fully represented by some registry entry
    pub covered: Vec<String>,
    /// Records whose entry is missing capabilities or clusters
    pub partially_covered: Vec<PartialCoverage>,
    /// Records with no registry entry at all
    pub uncovered: Vec<EntrySuggestion>,
}

/// Classify merged records against the registry. Side-effect-free.
pub fn analyze(registry: &[RegistryEntry], merged: &[MergedRecord]) -> CoverageReport {
    let mut report = CoverageReport::default();

    for record in merged {
        let entry = registry
            .iter()
            .find(|e| e.matches(record.manufacturer_id(), record.product_id()));

        match entry {
            None => report.uncovered.push(suggest_entry(record)),
            Some(entry) => {
                let missing_capabilities: BTreeSet<String> = record
                    .capabilities
                    .difference(&entry.capabilities)
                    .cloned()
                    .collect();
                let missing_clusters: BTreeSet<String> = record
                    .clusters
                    .iter()
                    .filter(|name| !entry_has_cluster(entry, name))
                    .cloned()
                    .collect();

                if missing_capabilities.is_empty() && missing_clusters.is_empty() {
                    report.covered.push(record.canonical_key.clone());
                } else {
                    report.partially_covered.push(PartialCoverage {
                        canonical_key: record.canonical_key.clone(),
                        entry_id: entry.id.clone(),
                        missing_capabilities,
                        missing_clusters,
                    });
                }
            }
        }
    }

    debug!(
        covered = report.covered.len(),
        partial = report.partially_covered.len(),
        uncovered = report.uncovered.len(),
        "Coverage analysis complete"
    );

    report
}

/// Whether an entry binds a cluster, matching symbolic names against
/// numeric ids through the static referential.
fn entry_has_cluster(entry: &RegistryEntry, name: &str) -> bool {
    let id = cluster_id(name);
    entry.clusters.iter().any(|c| match c {
        ClusterRef::Name(n) => n.eq_ignore_ascii_case(name) || (cluster_id(n).is_some() && cluster_id(n) == id),
        ClusterRef::Id(i) => id == Some(*i),
    })
}

fn suggest_entry(record: &MergedRecord) -> EntrySuggestion {
    EntrySuggestion {
        canonical_key: record.canonical_key.clone(),
        suggested_id: slug(record.product_id()),
        manufacturer_id: record.manufacturer_id().to_string(),
        product_id: record.product_id().to_string(),
        capabilities: record.capabilities.clone(),
        clusters: record.clusters.clone(),
    }
}

/// Lower-case alphanumeric slug for a suggested entry id.
fn slug(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
