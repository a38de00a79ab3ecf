// src/ingest/bound.rs
//! Upper-bound discovery: probe upward from 0 until a run of absences.

use futures::future::join_all;
use metrics::counter;

use crate::ingest::config::IngestConfig;
use crate::ingest::error::IngestError;
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::{Presence, RecordSource};

/// Consecutive absences that end a scan. A single miss is not enough: the
/// source sometimes reports an existing roll as missing.
pub const ABSENCE_RUN: u32 = 3;

/// Per-scan state. Lives for one call of [`find_upper_bound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRun {
    pub year: u16,
    /// Next sequence to be probed.
    pub next: u32,
    /// Highest sequence that answered `Exists`.
    pub highest_confirmed: Option<u32>,
    pub consecutive_misses: u32,
    /// Absent sequences in the current miss run.
    pending: Vec<u32>,
    /// Absent sequences later bridged by an `Exists`.
    gaps: Vec<u32>,
}

/// Result of a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpperBound {
    pub upper_bound: u32,
    /// Sequences in `1..=upper_bound` that probed absent, ascending.
    pub gaps: Vec<u32>,
}

impl UpperBound {
    pub fn is_gap(&self, sequence: u32) -> bool {
        self.gaps.binary_search(&sequence).is_ok()
    }
}

impl ProbeRun {
    pub fn new(year: u16) -> Self {
        Self {
            year,
            next: 0,
            highest_confirmed: None,
            consecutive_misses: 0,
            pending: Vec::new(),
            gaps: Vec::new(),
        }
    }

    /// Feed the result for `self.next`. Returns true once the scan is done.
    pub fn record(&mut self, presence: Presence) -> bool {
        match presence {
            Presence::Exists => {
                self.highest_confirmed = Some(self.next);
                self.consecutive_misses = 0;
                self.gaps.append(&mut self.pending);
            }
            Presence::Absent => {
                self.consecutive_misses += 1;
                // 0 is never a record; it only seeds the scan.
                if self.next > 0 {
                    self.pending.push(self.next);
                }
            }
        }
        self.next += 1;
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.consecutive_misses >= ABSENCE_RUN
    }

    /// `(next - 1) - misses`, floored at 0: the last sequence before the
    /// terminating run.
    pub fn upper_bound(&self) -> u32 {
        (i64::from(self.next) - 1 - i64::from(self.consecutive_misses)).max(0) as u32
    }

    pub fn finish(self) -> UpperBound {
        UpperBound {
            upper_bound: self.upper_bound(),
            gaps: self.gaps,
        }
    }
}

/// Find the highest valid sequence number for `year`; 0 means no records.
///
/// Probes may be issued `cfg.probe_window` at a time, but results are applied
/// in sequence order so the stop decision matches a strictly sequential scan.
/// Transport errors (after retries) propagate; they never count as absence.
pub async fn find_upper_bound<S: RecordSource + ?Sized>(
    source: &S,
    year: u16,
    cfg: &IngestConfig,
) -> Result<u32, IngestError> {
    scan_upper_bound(source, year, cfg).await.map(|b| b.upper_bound)
}

/// [`find_upper_bound`] that also reports the bridged gaps, so the year
/// ingestor can tell an expected absence from a broken record.
pub async fn scan_upper_bound<S: RecordSource + ?Sized>(
    source: &S,
    year: u16,
    cfg: &IngestConfig,
) -> Result<UpperBound, IngestError> {
    let policy = RetryPolicy::from_config(cfg);
    scan_upper_bound_with(source, year, cfg.scan_ceiling, cfg.probe_window, policy).await
}

pub async fn find_upper_bound_with<S: RecordSource + ?Sized>(
    source: &S,
    year: u16,
    ceiling: u32,
    window: usize,
    policy: RetryPolicy,
) -> Result<u32, IngestError> {
    scan_upper_bound_with(source, year, ceiling, window, policy)
        .await
        .map(|b| b.upper_bound)
}

pub async fn scan_upper_bound_with<S: RecordSource + ?Sized>(
    source: &S,
    year: u16,
    ceiling: u32,
    window: usize,
    policy: RetryPolicy,
) -> Result<UpperBound, IngestError> {
    let window = window.max(1) as u32;
    let mut run = ProbeRun::new(year);

    while !run.is_done() {
        if run.next > ceiling {
            tracing::warn!(target: "ingest", year, ceiling, "upper-bound scan hit ceiling");
            return Err(IngestError::ScanExhausted { year, ceiling });
        }
        let end = run.next.saturating_add(window - 1).min(ceiling);
        let batch = join_all((run.next..=end).map(|seq| {
            policy.run("probe", move || source.probe(year, seq))
        }))
        .await;

        for result in batch {
            let presence = result?;
            counter!("ingest_probes_total").increment(1);
            if !presence.exists() {
                counter!("ingest_probe_misses_total").increment(1);
            }
            // Results past the stop point are discarded, errors included.
            if run.record(presence) {
                break;
            }
        }
    }

    let probed = run.next;
    let bound = run.finish();
    tracing::info!(
        target: "ingest",
        year,
        upper_bound = bound.upper_bound,
        gaps = bound.gaps.len(),
        probed,
        "upper bound found"
    );
    Ok(bound)
}
