// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ingest;
pub mod telemetry;
pub mod vote;

// ---- Re-exports for stable public API ----
pub use crate::ingest::{
    ingest_range, ingest_year, survey_range, AppendWriter, IngestConfig, IngestError,
    RangeSummary, RecordSource,
};
pub use crate::vote::VoteRecord;
