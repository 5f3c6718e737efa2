//! Device record types for tracking source-reported device metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonicalize a manufacturer or product identifier.
///
/// Sources disagree on casing and whitespace (`_tz3000_abc` vs
/// `_TZ3000_ABC`, `ts0201 ` vs `TS0201`), so identifiers are trimmed and
/// upper-cased before they enter the pipeline.
pub fn canonicalize_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Derive the canonical key identifying one physical device model.
pub fn canonical_key(manufacturer_id: &str, product_id: &str) -> String {
    format!("{}::{}", manufacturer_id, product_id)
}

/// One source's normalized claim about a device's identifiers and features.
///
/// Immutable once created; the merge engine only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Canonicalized manufacturer identifier (e.g., "_TZ3000_QEUVNOHG")
    pub manufacturer_id: String,
    /// Canonicalized product identifier (e.g., "TS0201")
    pub product_id: String,
    /// Capability names claimed by this source
    pub capabilities: BTreeSet<String>,
    /// Symbolic cluster names claimed by this source
    pub clusters: BTreeSet<String>,
    /// Name of the source that produced this record
    pub source: String,
    /// When the source payload was fetched
    pub fetched_at: DateTime<Utc>,
    /// Source-assigned confidence in [0, 1]
    pub confidence_hint: f64,
}

impl DeviceRecord {
    /// Build a record, canonicalizing both identifiers.
    pub fn new(
        manufacturer_id: &str,
        product_id: &str,
        capabilities: BTreeSet<String>,
        clusters: BTreeSet<String>,
        source: &str,
        fetched_at: DateTime<Utc>,
        confidence_hint: f64,
    ) -> Self {
        Self {
            manufacturer_id: canonicalize_id(manufacturer_id),
            product_id: canonicalize_id(product_id),
            capabilities,
            clusters,
            source: source.to_string(),
            fetched_at,
            confidence_hint: confidence_hint.clamp(0.0, 1.0),
        }
    }

    /// The canonical key this record contributes to.
    pub fn canonical_key(&self) -> String {
        canonical_key(&self.manufacturer_id, &self.product_id)
    }
}

/// The reconciled, deduplicated view of a device across all sources in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    /// Unique key derived from manufacturer and product identifiers
    pub canonical_key: String,
    /// Union of capabilities across all contributing records
    pub capabilities: BTreeSet<String>,
    /// Union of clusters across all contributing records
    pub clusters: BTreeSet<String>,
    /// Contributing records in merge order; never empty
    pub provenance: Vec<DeviceRecord>,
    /// Highest confidence hint among contributing records
    pub confidence: f64,
}

impl MergedRecord {
    /// Manufacturer identifier shared by every record in the provenance.
    pub fn manufacturer_id(&self) -> &str {
        &self.provenance[0].manufacturer_id
    }

    /// Product identifier shared by every record in the provenance.
    pub fn product_id(&self) -> &str {
        &self.provenance[0].product_id
    }
}
