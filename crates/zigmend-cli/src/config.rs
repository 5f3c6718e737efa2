//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use zigmend_harvest::{ParserKind, SourceSpec};
use zigmend_registry::ValidationRunner;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default = "default_validator")]
    pub validator: ValidationRunner,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            harvest: HarvestConfig::default(),
            registry: RegistryConfig::default(),
            validator: default_validator(),
            report: ReportConfig::default(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Directory holding last-known-good payloads per source
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    "./cache".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory of registry entry files, one JSON file per driver entry
    #[serde(default = "default_registry_path")]
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

fn default_registry_path() -> String {
    "./registry".to_string()
}

fn default_validator() -> ValidationRunner {
    ValidationRunner {
        program: "validate".to_string(),
        level: "publish".to_string(),
        timeout_secs: 120,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Fixed output path for the run report; overwritten each run
    #[serde(default = "default_report_path")]
    pub path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}

fn default_report_path() -> String {
    "./zigmend-report.json".to_string()
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save an example configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        sources: vec![
            SourceSpec {
                name: "herdsman".to_string(),
                url: "https://example.org/zigbee-herdsman/devices.json".to_string(),
                parser: ParserKind::Herdsman,
                timeout_ms: 10_000,
            },
            SourceSpec {
                name: "devicedb".to_string(),
                url: "https://example.org/device-db/export.json".to_string(),
                parser: ParserKind::DeviceDb,
                timeout_ms: 10_000,
            },
            SourceSpec {
                name: "forum".to_string(),
                url: "https://example.org/community/reports.json".to_string(),
                parser: ParserKind::Community,
                timeout_ms: 15_000,
            },
        ],
        ..Config::default()
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[harvest]
cache_dir = "/var/cache/zigmend"

[registry]
path = "/srv/registry"

[validator]
program = "homey-validate"
level = "publish"
timeout_secs = 60

[report]
path = "/srv/report.json"

[[source]]
name = "herdsman"
url = "https://example.org/devices.json"
parser = "herdsman"
timeout_ms = 5000

[[source]]
name = "forum"
url = "https://example.org/reports.json"
parser = "community"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.harvest.cache_dir, "/var/cache/zigmend");
        assert_eq!(config.validator.program, "homey-validate");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].parser, ParserKind::Community);
        // Omitted timeout falls back to the default.
        assert_eq!(config.sources[1].timeout_ms, 10_000);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.registry.path, "./registry");
        assert_eq!(config.validator.level, "publish");
        assert_eq!(config.validator.timeout_secs, 120);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_default_config_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("zigmend.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].name, "herdsman");
    }
}
