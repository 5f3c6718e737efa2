//! Zigmend Harvest - fetching and normalizing external device metadata
//!
//! Each configured source is fetched concurrently with its own timeout;
//! failures fall back to the last-known-good payload cache. Raw payloads
//! are then normalized into canonical device records by a per-source
//! parser.

pub mod client;
pub mod harvest;
pub mod normalize;
pub mod source;

pub use client::{FetchError, RawPayload, SourceClient};
pub use harvest::{harvest, HarvestOutcome};
pub use normalize::{normalize, NormalizedBatch};
pub use source::{ParserKind, SourceSpec};
