//! Validation issue types produced by the external validator

use serde::{Deserialize, Serialize};

/// Category of a diagnosed registry problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueCode {
    /// A required field is absent from the entry
    MissingField,
    /// A cluster is referenced by symbolic name where a numeric id is required
    InvalidClusterType,
    /// A battery capability is declared without a battery specification
    MissingBatterySpec,
    /// The entry's device class is not in the valid set
    InvalidClassMapping,
    /// Anything the output parser could not classify
    Unknown,
}

/// A diagnosed problem in a registry entry, as reported by the validator.
///
/// This is diagnostic data, not an error: issues flow from the validation
/// runner into the remediator and, when unresolved, into the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    /// Registry entry the issue applies to; "*" covers the whole registry
    pub entry_id: String,
    pub detail: String,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, entry_id: &str, detail: &str) -> Self {
        Self {
            code,
            entry_id: entry_id.to_string(),
            detail: detail.to_string(),
        }
    }

    /// An issue covering the whole registry rather than one entry.
    pub fn registry_wide(code: IssueCode, detail: &str) -> Self {
        Self::new(code, "*", detail)
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{:?}] {}", self.entry_id, self.code, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_wide_issue() {
        let issue = ValidationIssue::registry_wide(IssueCode::Unknown, "validator timed out");
        assert_eq!(issue.entry_id, "*");
        assert_eq!(issue.code, IssueCode::Unknown);
    }

    #[test]
    fn test_serde_camel_case() {
        let issue = ValidationIssue::new(IssueCode::MissingBatterySpec, "e1", "no energy config");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"missingBatterySpec\""));
        assert!(json.contains("\"entryId\":\"e1\""));
    }
}
