//! Deterministic remediation of validated registry entries
//!
//! Applies a fixed, ordered list of idempotent transformations, each
//! keyed to one validation issue code. A transformation that cannot apply
//! leaves the entry untouched and the issue unresolved; unrecognized
//! codes are never touched.

use crate::clusters::cluster_id;
use tracing::debug;
use zigmend_core::{ClusterRef, EnergySpec, IssueCode, RegistryEntry, ValidationIssue};

/// Device classes the registry schema accepts
const VALID_CLASSES: &[&str] = &["light", "sensor", "socket", "thermostat", "lock", "other"];

/// Known-invalid class values and their canonical replacements
const CLASS_REPLACEMENTS: &[(&str, &str)] = &[
    ("switch", "socket"),
    ("plug", "socket"),
    ("outlet", "socket"),
    ("dimmer", "light"),
    ("bulb", "light"),
    ("curtain", "other"),
    ("remote", "other"),
];

/// Battery spec inserted for battery devices that lack one
const DEFAULT_BATTERIES: &[&str] = &["INTERNAL"];

/// Result of remediating one entry
#[derive(Debug)]
pub struct RemediationOutcome {
    pub entry: RegistryEntry,
    /// Issues whose transformation applied (or whose condition already holds)
    pub fixed: Vec<ValidationIssue>,
    /// Issues left for the report: unknown codes, unknown cluster names,
    /// unknown field names, or transformations that could not apply
    pub unresolved: Vec<ValidationIssue>,
}

/// Apply the remediation transformations for `issues` to `entry`.
///
/// Transformations run in a fixed order (cluster rewrite, battery spec,
/// class mapping, field defaults) and are pure over the entry; applying
/// the same transformation twice is a no-op.
pub fn remediate(entry: &RegistryEntry, issues: &[ValidationIssue]) -> RemediationOutcome {
    let mut entry = entry.clone();
    let mut fixed = Vec::new();
    let mut unresolved = Vec::new();

    // Fixed application order, independent of the order issues arrived in.
    const ORDER: [IssueCode; 4] = [
        IssueCode::InvalidClusterType,
        IssueCode::MissingBatterySpec,
        IssueCode::InvalidClassMapping,
        IssueCode::MissingField,
    ];

    for code in ORDER {
        for issue in issues.iter().filter(|i| i.code == code) {
            let resolved = match code {
                IssueCode::InvalidClusterType => fix_cluster_types(&mut entry),
                IssueCode::MissingBatterySpec => fix_battery_spec(&mut entry),
                IssueCode::InvalidClassMapping => fix_class(&mut entry),
                IssueCode::MissingField => fix_missing_field(&mut entry, &issue.detail),
                IssueCode::Unknown => false,
            };

            if resolved {
                fixed.push(issue.clone());
            } else {
                unresolved.push(issue.clone());
            }
        }
    }

    for issue in issues.iter().filter(|i| i.code == IssueCode::Unknown) {
        unresolved.push(issue.clone());
    }

    debug!(
        entry = %entry.id,
        fixed = fixed.len(),
        unresolved = unresolved.len(),
        "Remediation pass complete"
    );

    RemediationOutcome {
        entry,
        fixed,
        unresolved,
    }
}

/// Rewrite symbolic cluster names to numeric identifiers. Resolved only
/// when no symbolic name is left (unknown names pass through unchanged).
fn fix_cluster_types(entry: &mut RegistryEntry) -> bool {
    for cluster in entry.clusters.iter_mut() {
        if let ClusterRef::Name(name) = cluster {
            if let Some(id) = cluster_id(name) {
                *cluster = ClusterRef::Id(id);
            }
        }
    }
    entry
        .clusters
        .iter()
        .all(|c| matches!(c, ClusterRef::Id(_)))
}

/// Insert the default battery spec for battery devices lacking one.
/// Cannot apply to entries without a battery capability.
fn fix_battery_spec(entry: &mut RegistryEntry) -> bool {
    let battery_device = entry.capabilities.contains("measure_battery")
        || entry.capabilities.contains("alarm_battery");
    if !battery_device {
        return false;
    }

    if entry.energy.is_none() {
        entry.energy = Some(EnergySpec {
            batteries: DEFAULT_BATTERIES.iter().map(|s| s.to_string()).collect(),
        });
    }
    true
}

/// Rewrite a known-invalid class to its canonical replacement.
fn fix_class(entry: &mut RegistryEntry) -> bool {
    if VALID_CLASSES.contains(&entry.class.as_str()) {
        return true;
    }
    if let Some((_, replacement)) = CLASS_REPLACEMENTS
        .iter()
        .find(|(invalid, _)| invalid.eq_ignore_ascii_case(&entry.class))
    {
        entry.class = replacement.to_string();
        return true;
    }
    false
}

/// Insert a minimal valid default for a known missing field named in the
/// issue detail. Unknown field names stay unresolved.
fn fix_missing_field(entry: &mut RegistryEntry, detail: &str) -> bool {
    let detail_lower = detail.to_lowercase();

    if detail_lower.contains("schemaversion") || detail_lower.contains("schema version") {
        if entry.schema_version.is_empty() {
            entry.schema_version = "3".to_string();
        }
        return true;
    }

    if detail_lower.contains("name") {
        let default_name = serde_json::Value::String(entry.id.clone());
        entry
            .extra
            .entry("name".to_string())
            .or_insert(default_name);
        return true;
    }

    if detail_lower.contains("images") {
        entry.extra.entry("images".to_string()).or_insert_with(|| {
            serde_json::json!({
                "small": "assets/images/small.png",
                "large": "assets/images/large.png",
            })
        });
        return true;
    }

    false
}
