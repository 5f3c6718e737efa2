//! Driver registry entry types and directory I/O
//!
//! The registry is a directory with one canonical-JSON file per driver
//! entry. Zigmend reads every entry and, through the remediator, rewrites
//! entries in place. Fields it does not understand are preserved
//! byte-faithfully across a rewrite via a flattened catch-all map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse registry entry {path}: {source}")]
    ParseError {
        path: String,
        source: serde_json::Error,
    },
    #[error("Failed to serialize registry entry {id}: {source}")]
    SerializeError {
        id: String,
        source: serde_json::Error,
    },
}

/// A cluster reference in a registry entry: either a symbolic ZCL name
/// (e.g. "genOnOff") or a numeric cluster identifier (e.g. 6).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClusterRef {
    Id(u16),
    Name(String),
}

impl std::fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterRef::Id(id) => write!(f, "{}", id),
            ClusterRef::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Battery specification for battery-powered devices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySpec {
    pub batteries: Vec<String>,
}

/// A persisted local definition describing how a device is currently supported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Entry identifier; matches the file stem
    pub id: String,
    /// Device class (light, sensor, socket, thermostat, lock, other)
    #[serde(default)]
    pub class: String,
    /// Capability names this entry exposes
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Clusters this entry binds, by name or numeric id
    #[serde(default)]
    pub clusters: Vec<ClusterRef>,
    /// Manufacturer identifiers this entry matches
    #[serde(default)]
    pub manufacturer_ids: BTreeSet<String>,
    /// Product identifiers this entry matches
    #[serde(default)]
    pub product_ids: BTreeSet<String>,
    /// Battery specification, present for battery-powered devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergySpec>,
    /// Schema version of the entry format
    #[serde(default)]
    pub schema_version: String,
    /// Fields this tool does not understand, preserved on rewrite
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RegistryEntry {
    /// Whether this entry matches a manufacturer/product identifier pair.
    pub fn matches(&self, manufacturer_id: &str, product_id: &str) -> bool {
        self.manufacturer_ids.contains(manufacturer_id) && self.product_ids.contains(product_id)
    }

    /// Load a single entry from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| RegistryError::ParseError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Write this entry back to its file under the registry directory.
    pub fn save(&self, registry_dir: &Path) -> Result<PathBuf, RegistryError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| {
            RegistryError::SerializeError {
                id: self.id.clone(),
                source,
            }
        })?;
        let path = registry_dir.join(format!("{}.json", self.id));
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Load every parseable entry from a registry directory.
///
/// Entries that fail to parse are logged and skipped; a broken file must
/// not take down the whole run. Entries are returned sorted by id so
/// downstream stages see a deterministic order.
pub fn load_registry(dir: &Path) -> Result<Vec<RegistryEntry>, RegistryError> {
    let mut entries = Vec::new();

    for dir_entry in std::fs::read_dir(dir)? {
        let path = dir_entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match RegistryEntry::from_file(&path) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unparseable registry entry");
            }
        }
    }

    entries.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(count = entries.len(), dir = %dir.display(), "Loaded registry entries");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_json() -> &'static str {
        r#"{
            "id": "temperature_humidity_sensor",
            "class": "sensor",
            "capabilities": ["measure_temperature", "measure_humidity"],
            "clusters": ["genBasic", 1026],
            "manufacturerIds": ["_TZ3000_QEUVNOHG"],
            "productIds": ["TS0201"],
            "schemaVersion": "3",
            "icon": "assets/icon.svg",
            "settings": [{"id": "report_interval", "value": 60}]
        }"#
    }

    #[test]
    fn test_parse_mixed_cluster_forms() {
        let entry: RegistryEntry = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(
            entry.clusters,
            vec![ClusterRef::Name("genBasic".to_string()), ClusterRef::Id(1026)]
        );
    }

    #[test]
    fn test_matches() {
        let entry: RegistryEntry = serde_json::from_str(sample_json()).unwrap();
        assert!(entry.matches("_TZ3000_QEUVNOHG", "TS0201"));
        assert!(!entry.matches("_TZ3000_QEUVNOHG", "TS0601"));
        assert!(!entry.matches("_TZE200_OTHER", "TS0201"));
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let temp_dir = TempDir::new().unwrap();
        let entry: RegistryEntry = serde_json::from_str(sample_json()).unwrap();
        assert!(entry.extra.contains_key("icon"));
        assert!(entry.extra.contains_key("settings"));

        entry.save(temp_dir.path()).unwrap();
        let reloaded =
            RegistryEntry::from_file(&temp_dir.path().join("temperature_humidity_sensor.json"))
                .unwrap();
        assert_eq!(reloaded.extra.get("icon"), entry.extra.get("icon"));
        assert_eq!(reloaded.extra.get("settings"), entry.extra.get("settings"));
    }

    #[test]
    fn test_load_registry_skips_broken_entries() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("good.json"), sample_json()).unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let entries = load_registry(temp_dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "temperature_humidity_sensor");
    }

    #[test]
    fn test_load_registry_sorted_by_id() {
        let temp_dir = TempDir::new().unwrap();
        for id in ["zebra", "alpha", "mid"] {
            let json = format!(r#"{{"id": "{}"}}"#, id);
            std::fs::write(temp_dir.path().join(format!("{}.json", id)), json).unwrap();
        }

        let entries = load_registry(temp_dir.path()).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zebra"]);
    }
}
