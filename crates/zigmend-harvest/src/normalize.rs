//! Per-source payload normalization into canonical device records
//!
//! Each source has its own raw schema; one pure parser per
//! [`ParserKind`] maps it to [`DeviceRecord`]s. Malformed or
//! partially-parseable entries are skipped individually and counted,
//! never fatal to the whole payload.

use crate::source::ParserKind;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};
use zigmend_core::DeviceRecord;

/// Result of normalizing one source payload
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub records: Vec<DeviceRecord>,
    /// Entries dropped because they were malformed or incomplete
    pub skipped: u64,
}

/// Normalize a raw payload into device records. Pure: no I/O.
pub fn normalize(
    source_name: &str,
    kind: ParserKind,
    payload: &[u8],
    fetched_at: DateTime<Utc>,
) -> NormalizedBatch {
    let confidence = kind.confidence_hint();
    let batch = match kind {
        ParserKind::Herdsman => parse_herdsman(source_name, payload, fetched_at, confidence),
        ParserKind::DeviceDb => parse_device_db(source_name, payload, fetched_at, confidence),
        ParserKind::Community => parse_community(source_name, payload, fetched_at, confidence),
    };

    debug!(
        source = %source_name,
        records = batch.records.len(),
        skipped = batch.skipped,
        "Normalized source payload"
    );
    batch
}

fn string_set(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// zigbee-herdsman-converters device dump:
/// `{"devices": [{"manufacturerName": [..], "productId": [..], ...}]}`
fn parse_herdsman(
    source: &str,
    payload: &[u8],
    fetched_at: DateTime<Utc>,
    confidence: f64,
) -> NormalizedBatch {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        devices: Vec<serde_json::Value>,
    }

    #[derive(Deserialize)]
    struct HerdsmanDevice {
        #[serde(rename = "manufacturerName")]
        manufacturer_names: Vec<String>,
        #[serde(rename = "productId")]
        product_ids: Vec<String>,
        #[serde(default)]
        capabilities: Vec<String>,
        #[serde(default)]
        clusters: Vec<String>,
    }

    let envelope: Envelope = match serde_json::from_slice(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(source = %source, error = %e, "Herdsman payload envelope unparseable");
            return NormalizedBatch {
                records: Vec::new(),
                skipped: 1,
            };
        }
    };

    let mut batch = NormalizedBatch::default();
    for value in envelope.devices {
        let device: HerdsmanDevice = match serde_json::from_value(value) {
            Ok(device) => device,
            Err(_) => {
                batch.skipped += 1;
                continue;
            }
        };

        if device.manufacturer_names.is_empty() || device.product_ids.is_empty() {
            batch.skipped += 1;
            continue;
        }

        // A herdsman entry matches any manufacturer/product combination it
        // lists; emit one record per pair.
        for manufacturer in &device.manufacturer_names {
            for product in &device.product_ids {
                batch.records.push(DeviceRecord::new(
                    manufacturer,
                    product,
                    string_set(&device.capabilities),
                    string_set(&device.clusters),
                    source,
                    fetched_at,
                    confidence,
                ));
            }
        }
    }
    batch
}

/// Flat community device database: an array of
/// `{"manufacturer": .., "model": .., "features": [..], "clusters": [..]}`
fn parse_device_db(
    source: &str,
    payload: &[u8],
    fetched_at: DateTime<Utc>,
    confidence: f64,
) -> NormalizedBatch {
    #[derive(Deserialize)]
    struct DbEntry {
        manufacturer: String,
        model: String,
        #[serde(default)]
        features: Vec<String>,
        #[serde(default)]
        clusters: Vec<String>,
    }

    let values: Vec<serde_json::Value> = match serde_json::from_slice(payload) {
        Ok(values) => values,
        Err(e) => {
            warn!(source = %source, error = %e, "Device database payload unparseable");
            return NormalizedBatch {
                records: Vec::new(),
                skipped: 1,
            };
        }
    };

    let mut batch = NormalizedBatch::default();
    for value in values {
        let entry: DbEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(_) => {
                batch.skipped += 1;
                continue;
            }
        };

        if entry.manufacturer.trim().is_empty() || entry.model.trim().is_empty() {
            batch.skipped += 1;
            continue;
        }

        batch.records.push(DeviceRecord::new(
            &entry.manufacturer,
            &entry.model,
            string_set(&entry.features),
            string_set(&entry.clusters),
            source,
            fetched_at,
            confidence,
        ));
    }
    batch
}

/// Forum-report export:
/// `{"posts": [{"manufacturerName": .., "productId": .., "capabilities": [..]}]}`
fn parse_community(
    source: &str,
    payload: &[u8],
    fetched_at: DateTime<Utc>,
    confidence: f64,
) -> NormalizedBatch {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        posts: Vec<serde_json::Value>,
    }

    #[derive(Deserialize)]
    struct Post {
        #[serde(rename = "manufacturerName")]
        manufacturer_name: String,
        #[serde(rename = "productId")]
        product_id: String,
        #[serde(default)]
        capabilities: Vec<String>,
    }

    let envelope: Envelope = match serde_json::from_slice(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(source = %source, error = %e, "Community payload envelope unparseable");
            return NormalizedBatch {
                records: Vec::new(),
                skipped: 1,
            };
        }
    };

    let mut batch = NormalizedBatch::default();
    for value in envelope.posts {
        let post: Post = match serde_json::from_value(value) {
            Ok(post) => post,
            Err(_) => {
                batch.skipped += 1;
                continue;
            }
        };

        if post.manufacturer_name.trim().is_empty() || post.product_id.trim().is_empty() {
            batch.skipped += 1;
            continue;
        }

        // Forum reports rarely mention clusters; capabilities only.
        batch.records.push(DeviceRecord::new(
            &post.manufacturer_name,
            &post.product_id,
            string_set(&post.capabilities),
            BTreeSet::new(),
            source,
            fetched_at,
            confidence,
        ));
    }
    batch
}
