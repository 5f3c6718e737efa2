//! Deduplication and merging of device records across sources
//!
//! Records describing the same physical device (same canonical key) are
//! unified into a single [`MergedRecord`]. Merge order within a group is a
//! fixed total order - ascending lexicographic source name, input position
//! as tie-break - so repeated runs over identical input produce identical
//! output.

use crate::record::{DeviceRecord, MergedRecord};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MergeError {
    /// An input record failed to end up in exactly one provenance list.
    /// This indicates a bug in the reconciliation logic itself and aborts
    /// the run.
    #[error("provenance loss for {canonical_key}: expected {expected} contributing records, found {found}")]
    ProvenanceLoss {
        canonical_key: String,
        expected: usize,
        found: usize,
    },
}

/// Merge device records into one [`MergedRecord`] per canonical key.
///
/// Capabilities and clusters are unioned across the group; confidence is
/// the maximum contributing hint, so a single high-confidence source is
/// not diluted by low-confidence duplicates. Singleton groups are still
/// emitted (provenance length 1). Output is sorted by canonical key.
pub fn merge(records: Vec<DeviceRecord>) -> Result<Vec<MergedRecord>, MergeError> {
    let records_in = records.len();

    // Group by canonical key, remembering input position for the tie-break.
    let mut groups: BTreeMap<String, Vec<(usize, DeviceRecord)>> = BTreeMap::new();
    for (position, record) in records.into_iter().enumerate() {
        groups
            .entry(record.canonical_key())
            .or_default()
            .push((position, record));
    }

    let mut merged = Vec::with_capacity(groups.len());
    for (key, mut group) in groups {
        let expected = group.len();

        // Fixed total order: source name ascending, then input position.
        group.sort_by(|(pos_a, a), (pos_b, b)| {
            a.source.cmp(&b.source).then(pos_a.cmp(pos_b))
        });

        let mut capabilities = std::collections::BTreeSet::new();
        let mut clusters = std::collections::BTreeSet::new();
        let mut confidence = 0.0f64;
        let mut provenance = Vec::with_capacity(expected);

        for (_, record) in group {
            capabilities.extend(record.capabilities.iter().cloned());
            clusters.extend(record.clusters.iter().cloned());
            confidence = confidence.max(record.confidence_hint);
            provenance.push(record);
        }

        if provenance.len() != expected {
            return Err(MergeError::ProvenanceLoss {
                canonical_key: key,
                expected,
                found: provenance.len(),
            });
        }

        merged.push(MergedRecord {
            canonical_key: key,
            capabilities,
            clusters,
            provenance,
            confidence,
        });
    }

    let records_out: usize = merged.iter().map(|m| m.provenance.len()).sum();
    if records_out != records_in {
        // No single key to blame when totals diverge; report the first
        // group as the closest lead.
        let key = merged
            .first()
            .map(|m| m.canonical_key.clone())
            .unwrap_or_default();
        return Err(MergeError::ProvenanceLoss {
            canonical_key: key,
            expected: records_in,
            found: records_out,
        });
    }

    debug!(
        records_in = records_in,
        records_out = merged.len(),
        "Merged device records"
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record(
        manufacturer: &str,
        product: &str,
        caps: &[&str],
        clusters: &[&str],
        source: &str,
        confidence: f64,
    ) -> DeviceRecord {
        DeviceRecord::new(
            manufacturer,
            product,
            set(caps),
            set(clusters),
            source,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            confidence,
        )
    }

    #[test]
    fn test_case_insensitive_merge() {
        // Two sources disagree on casing; both land in one merged record.
        let records = vec![
            record("TZ3000", "TS0201", &["measure_temperature"], &[], "herdsman", 0.9),
            record("tz3000", "ts0201", &["measure_humidity"], &[], "community", 0.4),
        ];

        let merged = merge(records).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].canonical_key, "TZ3000::TS0201");
        assert_eq!(
            merged[0].capabilities,
            set(&["measure_humidity", "measure_temperature"])
        );
        assert_eq!(merged[0].provenance.len(), 2);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let make = || {
            vec![
                record("A", "P1", &["x"], &["onOff"], "zeta", 0.5),
                record("A", "P1", &["y"], &["basic"], "alpha", 0.8),
                record("B", "P2", &["z"], &[], "mid", 0.3),
            ]
        };

        let first = merge(make()).unwrap();
        let second = merge(make()).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        // Provenance follows source order, not input order.
        assert_eq!(first[0].provenance[0].source, "alpha");
        assert_eq!(first[0].provenance[1].source, "zeta");
    }

    #[test]
    fn test_provenance_completeness() {
        let records = vec![
            record("A", "P1", &[], &[], "s1", 0.1),
            record("A", "P1", &[], &[], "s2", 0.2),
            record("A", "P1", &[], &[], "s1", 0.3),
            record("C", "P9", &[], &[], "s3", 0.4),
        ];
        let total = records.len();

        let merged = merge(records).unwrap();
        let provenance_total: usize = merged.iter().map(|m| m.provenance.len()).sum();
        assert_eq!(provenance_total, total);
    }

    #[test]
    fn test_union_monotonicity() {
        let records = vec![
            record("A", "P", &["a", "b"], &["onOff"], "s1", 0.5),
            record("A", "P", &["b", "c"], &["basic", "onOff"], "s2", 0.5),
        ];
        let inputs = records.clone();

        let merged = merge(records).unwrap();
        for input in &inputs {
            assert!(merged[0].capabilities.is_superset(&input.capabilities));
            assert!(merged[0].clusters.is_superset(&input.clusters));
        }
    }

    #[test]
    fn test_confidence_is_max_not_average() {
        let records = vec![
            record("A", "P", &[], &[], "s1", 0.9),
            record("A", "P", &[], &[], "s2", 0.2),
            record("A", "P", &[], &[], "s3", 0.2),
        ];
        let merged = merge(records).unwrap();
        assert_eq!(merged[0].confidence, 0.9);
    }

    #[test]
    fn test_singleton_group_emitted() {
        let merged = merge(vec![record("A", "P", &["x"], &[], "only", 0.7)]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].provenance.len(), 1);
        assert_eq!(merged[0].confidence, 0.7);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_output_sorted_by_key() {
        let records = vec![
            record("Z", "P", &[], &[], "s", 0.5),
            record("A", "P", &[], &[], "s", 0.5),
            record("M", "P", &[], &[], "s", 0.5),
        ];
        let merged = merge(records).unwrap();
        let keys: Vec<&str> = merged.iter().map(|m| m.canonical_key.as_str()).collect();
        assert_eq!(keys, vec!["A::P", "M::P", "Z::P"]);
    }
}
