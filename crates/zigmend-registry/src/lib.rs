//! Zigmend Registry - analysis and repair of the local driver registry
//!
//! This crate reads the driver registry, classifies how well it covers
//! harvested device records, runs the external validator, and applies the
//! fixed set of deterministic remediation transformations to flagged
//! entries.

pub mod analyze;
pub mod clusters;
pub mod remediate;
pub mod validate;

pub use analyze::{analyze, CoverageReport, EntrySuggestion, PartialCoverage};
pub use clusters::{cluster_id, cluster_name};
pub use remediate::{remediate, RemediationOutcome};
pub use validate::{ValidateError, ValidationOutcome, ValidationRunner};
