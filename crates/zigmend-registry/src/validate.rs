//! External validator invocation and output parsing
//!
//! The validator is a black-box subprocess invoked as
//! `<program> <registryPath> --level=<level>`; it communicates solely via
//! stdout/stderr text and its exit code. Output lines are parsed
//! best-effort into [`ValidationIssue`]s; unparseable lines are counted,
//! never fatal.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};
use zigmend_core::{IssueCode, ValidationIssue};

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("failed to spawn validator '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Result of one validator invocation
#[derive(Debug)]
pub struct ValidationOutcome {
    pub issues: Vec<ValidationIssue>,
    /// Output lines the parser could not turn into issues
    pub unparsed_lines: u64,
    /// False when the validator timed out: the registry was not actually
    /// diagnosed, so remediation has nothing trustworthy to act on.
    pub diagnostics_available: bool,
}

/// Configuration for the validator subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRunner {
    /// Program to invoke
    pub program: String,
    /// Validation level passed as `--level=<level>`
    pub level: String,
    /// Hard timeout in seconds for one invocation
    pub timeout_secs: u64,
}

impl ValidationRunner {
    /// Run the validator against a registry directory.
    ///
    /// A non-zero exit with parseable issues is the normal flow. A timeout
    /// yields a single registry-wide `Unknown` issue and marks diagnostics
    /// unavailable.
    pub async fn validate(&self, registry_path: &Path) -> Result<ValidationOutcome, ValidateError> {
        info!(
            program = %self.program,
            registry = %registry_path.display(),
            level = %self.level,
            "Running external validator"
        );

        let output = Command::new(&self.program)
            .arg(registry_path)
            .arg(format!("--level={}", self.level))
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), output).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ValidateError::Spawn {
                    program: self.program.clone(),
                    source,
                });
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout_secs,
                    "Validator timed out, registry not diagnosed this round"
                );
                return Ok(ValidationOutcome {
                    issues: vec![ValidationIssue::registry_wide(
                        IssueCode::Unknown,
                        &format!("validator timed out after {} s", self.timeout_secs),
                    )],
                    unparsed_lines: 0,
                    diagnostics_available: false,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut issues = Vec::new();
        let mut unparsed_lines = 0u64;
        for line in stdout.lines().chain(stderr.lines()) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_issue_line(line) {
                Some(issue) => issues.push(issue),
                None => unparsed_lines += 1,
            }
        }

        debug!(
            exit = ?output.status.code(),
            issues = issues.len(),
            unparsed = unparsed_lines,
            "Validator finished"
        );

        Ok(ValidationOutcome {
            issues,
            unparsed_lines,
            diagnostics_available: true,
        })
    }
}

/// Parse one validator output line of the shape `entry_id: detail`.
///
/// The classification is a keyword match over the detail text; anything
/// that names an entry but defies classification becomes `Unknown`.
fn parse_issue_line(line: &str) -> Option<ValidationIssue> {
    let (entry_id, detail) = line.split_once(':')?;
    let entry_id = entry_id.trim();
    let detail = detail.trim();

    // Entry ids are file stems; a "prefix" with spaces is prose, not an id.
    if entry_id.is_empty() || detail.is_empty() || entry_id.contains(char::is_whitespace) {
        return None;
    }

    let lower = detail.to_lowercase();
    let code = if lower.contains("cluster") {
        IssueCode::InvalidClusterType
    } else if lower.contains("battery") || lower.contains("energy") {
        IssueCode::MissingBatterySpec
    } else if lower.contains("class") {
        IssueCode::InvalidClassMapping
    } else if lower.contains("missing") {
        IssueCode::MissingField
    } else {
        IssueCode::Unknown
    };

    Some(ValidationIssue::new(code, entry_id, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Write an executable stub validator script and return its path.
    #[cfg(unix)]
    fn stub_validator(dir: &TempDir, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("validate.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_parse_cluster_issue() {
        let issue = parse_issue_line("plug_socket: invalid cluster 'genOnOff'").unwrap();
        assert_eq!(issue.code, IssueCode::InvalidClusterType);
        assert_eq!(issue.entry_id, "plug_socket");
        assert_eq!(issue.detail, "invalid cluster 'genOnOff'");
    }

    #[test]
    fn test_parse_battery_issue() {
        let issue = parse_issue_line("pir_sensor: Missing energy config for battery device").unwrap();
        // Battery/energy outranks the generic "missing" keyword.
        assert_eq!(issue.code, IssueCode::MissingBatterySpec);
    }

    #[test]
    fn test_parse_class_issue() {
        let issue = parse_issue_line("wall_switch: Invalid class 'switch'").unwrap();
        assert_eq!(issue.code, IssueCode::InvalidClassMapping);
    }

    #[test]
    fn test_parse_missing_field_issue() {
        let issue = parse_issue_line("smoke_detector: Missing name in entry").unwrap();
        assert_eq!(issue.code, IssueCode::MissingField);
    }

    #[test]
    fn test_unclassifiable_detail_is_unknown() {
        let issue = parse_issue_line("e1: something inexplicable happened").unwrap();
        assert_eq!(issue.code, IssueCode::Unknown);
    }

    #[test]
    fn test_prose_lines_are_unparsed() {
        assert!(parse_issue_line("Validating 42 entries...").is_none());
        assert!(parse_issue_line("Validation failed: see above").is_none());
        assert!(parse_issue_line(": no entry id").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_yields_registry_wide_unknown() {
        let dir = TempDir::new().unwrap();
        let script = stub_validator(&dir, "sleep 30");
        let runner = ValidationRunner {
            program: script.display().to_string(),
            level: "publish".to_string(),
            timeout_secs: 1,
        };

        let outcome = runner.validate(dir.path()).await.unwrap();
        assert!(!outcome.diagnostics_available);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].entry_id, "*");
        assert_eq!(outcome.issues[0].code, IssueCode::Unknown);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_with_parseable_issues() {
        let dir = TempDir::new().unwrap();
        let script = stub_validator(
            &dir,
            "echo \"Checking entries...\"\n\
             echo \"e1: invalid cluster 'genOnOff'\"\n\
             echo \"e2: Missing energy config for battery device\" >&2\n\
             exit 1",
        );
        let runner = ValidationRunner {
            program: script.display().to_string(),
            level: "publish".to_string(),
            timeout_secs: 10,
        };

        let outcome = runner.validate(dir.path()).await.unwrap();
        assert!(outcome.diagnostics_available);
        assert_eq!(outcome.issues.len(), 2);
        assert_eq!(outcome.issues[0].code, IssueCode::InvalidClusterType);
        assert_eq!(outcome.issues[1].code, IssueCode::MissingBatterySpec);
        assert_eq!(outcome.unparsed_lines, 1);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = ValidationRunner {
            program: "definitely-not-a-real-validator".to_string(),
            level: "publish".to_string(),
            timeout_secs: 5,
        };

        let result = runner.validate(Path::new(".")).await;
        assert!(matches!(result, Err(ValidateError::Spawn { .. })));
    }
}
