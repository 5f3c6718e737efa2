//! Zigmend Core - Core types, merge engine, and persistence for Zigmend
//!
//! This crate provides the foundational types for the Zigmend system:
//! - Device records as reported by external sources, and their merged view
//! - The deduplication/merge engine with provenance tracking
//! - Content-addressed payload cache used for offline fallback
//! - Driver registry entry types and directory I/O
//! - Run metrics shared across pipeline stages

pub mod cache;
pub mod issue;
pub mod merge;
pub mod metrics;
pub mod record;
pub mod registry;

pub use cache::{CacheError, CachedPayload, PayloadCache};
pub use issue::{IssueCode, ValidationIssue};
pub use merge::{merge, MergeError};
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use record::{canonical_key, canonicalize_id, DeviceRecord, MergedRecord};
pub use registry::{ClusterRef, EnergySpec, RegistryEntry, RegistryError};
