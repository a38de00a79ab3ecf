// src/ingest/year.rs
use std::path::Path;

use futures::stream::{self, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::ingest::bound::scan_upper_bound;
use crate::ingest::config::IngestConfig;
use crate::ingest::error::{FailureKind, IngestError, YearFailure};
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::RecordSource;
use crate::ingest::writer::AppendWriter;

/// Consecutive fetch failures that abort a year. Expected absences are
/// handled by the prober and never reach this counter.
pub const FETCH_FAILURE_RUN: u32 = 3;

/// One record (or a whole year, when `sequence` is `None`) that was not ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordFailure {
    pub year: u16,
    pub sequence: Option<u32>,
    pub kind: FailureKind,
    pub message: String,
}

impl RecordFailure {
    pub fn new(year: u16, sequence: Option<u32>, err: &IngestError) -> Self {
        Self {
            year,
            sequence,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearReport {
    pub year: u16,
    pub upper_bound: u32,
    pub written: usize,
    /// Bridged gaps whose fetch confirmed the record is missing.
    #[serde(default)]
    pub absent: Vec<u32>,
    pub failures: Vec<RecordFailure>,
}

impl YearReport {
    pub fn new(year: u16) -> Self {
        Self {
            year,
            ..Self::default()
        }
    }
}

/// Ingest every record of `year` into `writer`.
///
/// Records are fetched with bounded concurrency but appended strictly in
/// ascending sequence order. A transport or decode failure on one sequence is
/// logged and skipped; [`FETCH_FAILURE_RUN`] of them in a row abort the year.
/// Sequences the scan saw as absent are still fetched, since a single miss
/// may be transient; a decode failure there is an expected absence and is
/// neither counted nor reported as a failure. Write failures abort
/// immediately.
pub async fn ingest_year<S: RecordSource + ?Sized>(
    source: &S,
    writer: &mut AppendWriter,
    year: u16,
    cfg: &IngestConfig,
) -> Result<YearReport, YearFailure> {
    let mut report = YearReport::new(year);

    let scan = match scan_upper_bound(source, year, cfg).await {
        Ok(scan) => scan,
        Err(source) => return Err(YearFailure::Fatal { report, source }),
    };
    let upper_bound = scan.upper_bound;
    report.upper_bound = upper_bound;
    if upper_bound == 0 {
        tracing::info!(target: "ingest", year, "no records for year");
        return Ok(report);
    }

    let policy = RetryPolicy::from_config(cfg);
    let mut fetches = stream::iter(1..=upper_bound)
        .map(|seq| async move {
            let result = policy.run("fetch", || source.fetch(year, seq)).await;
            (seq, result)
        })
        .buffered(cfg.fetch_concurrency.max(1));

    let mut consecutive: u32 = 0;
    while let Some((seq, result)) = fetches.next().await {
        match result {
            Ok(record) => {
                consecutive = 0;
                if let Err(source) = writer.append(&record).await {
                    tracing::error!(target: "ingest", year, sequence = seq, error = %source, "write failed");
                    return Err(YearFailure::Fatal { report, source });
                }
                report.written += 1;
                counter!("ingest_records_written_total").increment(1);
            }
            Err(e) if e.kind() == FailureKind::Decode && scan.is_gap(seq) => {
                tracing::debug!(target: "ingest", year, sequence = seq, "gap confirmed absent");
                report.absent.push(seq);
            }
            Err(e) => {
                consecutive += 1;
                tracing::warn!(
                    target: "ingest",
                    year,
                    sequence = seq,
                    kind = %e.kind(),
                    error = %e,
                    "skipping record"
                );
                counter!("ingest_record_failures_total", "kind" => e.kind().as_str()).increment(1);
                report.failures.push(RecordFailure::new(year, Some(seq), &e));
                if consecutive >= FETCH_FAILURE_RUN {
                    tracing::error!(target: "ingest", year, sequence = seq, consecutive, "aborting year");
                    return Err(YearFailure::Aborted {
                        report,
                        consecutive,
                    });
                }
            }
        }
    }

    tracing::info!(
        target: "ingest",
        year,
        upper_bound,
        written = report.written,
        absent = report.absent.len(),
        failed = report.failures.len(),
        "year ingested"
    );
    Ok(report)
}

/// [`ingest_year`] against a file path; opens its own writer.
pub async fn ingest_year_to_path<S: RecordSource + ?Sized>(
    source: &S,
    year: u16,
    path: impl AsRef<Path>,
    cfg: &IngestConfig,
) -> Result<YearReport, YearFailure> {
    let mut writer = match AppendWriter::open(path).await {
        Ok(w) => w,
        Err(source) => {
            return Err(YearFailure::Fatal {
                report: YearReport::new(year),
                source,
            })
        }
    };
    ingest_year(source, &mut writer, year, cfg).await
}
