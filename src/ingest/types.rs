// src/ingest/types.rs
use crate::ingest::error::IngestError;
use crate::vote::VoteRecord;

/// Outcome of an existence check. Transport problems are errors, not `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Exists,
    Absent,
}

impl Presence {
    pub fn exists(self) -> bool {
        matches!(self, Presence::Exists)
    }
}

/// A place roll-call documents can be probed and fetched from,
/// addressed by (year, sequence number within year).
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Lightweight existence check (no body transfer).
    async fn probe(&self, year: u16, sequence: u32) -> Result<Presence, IngestError>;

    /// Retrieve and decode the full document.
    async fn fetch(&self, year: u16, sequence: u32) -> Result<VoteRecord, IngestError>;

    fn name(&self) -> &'static str;
}

/// `{base}/{year}/roll{sequence:03}.xml`
pub fn record_url(base_url: &str, year: u16, sequence: u32) -> String {
    format!(
        "{}/{}/roll{:03}.xml",
        base_url.trim_end_matches('/'),
        year,
        sequence
    )
}
