//! Source specifications for external device-metadata endpoints

use serde::{Deserialize, Serialize};

/// Which parser decodes a source's raw payload.
///
/// Parser selection is static configuration: adding a source means adding
/// one variant here and one parser in [`crate::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// zigbee-herdsman-converters device dump
    Herdsman,
    /// Flat community device database
    DeviceDb,
    /// Forum-report export
    Community,
}

impl ParserKind {
    /// Default confidence hint for records produced from this source kind.
    ///
    /// The converter database is curated, the device database is
    /// community-maintained, and forum reports are anecdotal.
    pub fn confidence_hint(&self) -> f64 {
        match self {
            ParserKind::Herdsman => 0.9,
            ParserKind::DeviceDb => 0.7,
            ParserKind::Community => 0.4,
        }
    }
}

/// One configured external source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Source name, unique per run; also the cache key
    pub name: String,
    /// Endpoint URL
    pub url: String,
    /// Parser that decodes this source's payload
    pub parser: ParserKind,
    /// Per-fetch timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}
