//! Last-known-good payload cache with SHA-based integrity checks
//!
//! Stores the most recent raw payload fetched from each source so a run
//! can fall back to cached data when a source is unreachable. Retention is
//! one payload per source, last-write-wins; the manifest records the
//! origin URL, SHA-256 hash, and fetch time of each payload. Reads verify
//! the hash and treat a mismatch as a cache miss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Cache manifest entry for a single source payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPayload {
    /// Original URL this was fetched from
    pub url: String,
    /// SHA256 hash of the payload content
    pub sha: String,
    /// Local file path (relative to cache directory)
    pub path: String,
    /// When this was fetched
    pub fetched_at: DateTime<Utc>,
}

/// The cache manifest tracks the last-known-good payload per source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Version of the manifest format
    #[serde(default = "default_version")]
    pub version: String,
    /// Payload entries keyed by source name
    pub sources: HashMap<String, CachedPayload>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl CacheManifest {
    fn load_or_create(path: &Path) -> Result<Self, CacheError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self {
                version: default_version(),
                sources: HashMap::new(),
            })
        }
    }

    fn save(&self, path: &Path) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Payload cache directory manager
#[derive(Debug)]
pub struct PayloadCache {
    /// Base directory for the cache
    pub base_dir: PathBuf,
    manifest_path: PathBuf,
    manifest: CacheManifest,
}

impl PayloadCache {
    /// Open (or create) a payload cache at the given directory.
    pub fn new(base_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&base_dir)?;

        let manifest_path = base_dir.join("manifest.json");
        let manifest = CacheManifest::load_or_create(&manifest_path)?;

        Ok(Self {
            base_dir,
            manifest_path,
            manifest,
        })
    }

    fn payload_path(&self, source: &str) -> PathBuf {
        self.base_dir.join(format!("{}.payload", source))
    }

    /// Store a source's payload, replacing any previous one.
    pub fn put(&mut self, source: &str, url: &str, content: &[u8]) -> Result<(), CacheError> {
        let path = self.payload_path(source);
        std::fs::write(&path, content)?;

        self.manifest.sources.insert(
            source.to_string(),
            CachedPayload {
                url: url.to_string(),
                sha: sha256_hex(content),
                path: format!("{}.payload", source),
                fetched_at: Utc::now(),
            },
        );
        self.manifest.save(&self.manifest_path)?;

        Ok(())
    }

    /// Read back the last-known-good payload for a source.
    ///
    /// Returns `None` when nothing was ever cached, the file is gone, or
    /// the content no longer matches the recorded hash.
    pub fn get(&self, source: &str) -> Option<Vec<u8>> {
        let entry = self.manifest.sources.get(source)?;
        let path = self.base_dir.join(&entry.path);

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(source = %source, error = %e, "Cached payload unreadable");
                return None;
            }
        };

        if sha256_hex(&content) != entry.sha {
            warn!(source = %source, "Cached payload hash mismatch, treating as absent");
            return None;
        }

        Some(content)
    }

    /// Metadata for a cached payload, if any.
    pub fn entry(&self, source: &str) -> Option<&CachedPayload> {
        self.manifest.sources.get(source)
    }

    /// Number of sources with a cached payload.
    pub fn len(&self) -> usize {
        self.manifest.sources.len()
    }

    /// Whether the cache holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.manifest.sources.is_empty()
    }
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
