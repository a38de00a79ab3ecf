// src/ingest/range.rs
use std::path::Path;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};

use crate::ingest::bound::find_upper_bound;
use crate::ingest::config::IngestConfig;
use crate::ingest::ensure_metrics_described;
use crate::ingest::error::{FailureKind, IngestError, YearFailure};
use crate::ingest::types::RecordSource;
use crate::ingest::writer::AppendWriter;
use crate::ingest::year::{ingest_year, RecordFailure, YearReport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YearStatus {
    Completed,
    /// Stopped after a run of fetch failures; `written` records are kept.
    Aborted,
    /// Scan or write failure; `written` records are kept.
    Failed,
}

impl YearStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearSummary {
    pub year: u16,
    pub upper_bound: u32,
    pub written: usize,
    pub status: YearStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeSummary {
    pub start_year: u16,
    pub end_year: u16,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In processing order (descending year).
    pub years: Vec<YearSummary>,
    pub failures: Vec<RecordFailure>,
}

impl RangeSummary {
    pub fn total_written(&self) -> usize {
        self.years.iter().map(|y| y.written).sum()
    }

    pub fn failed_years(&self) -> impl Iterator<Item = &YearSummary> {
        self.years
            .iter()
            .filter(|y| y.status != YearStatus::Completed)
    }

    /// Every year ran to the end; skipped records are allowed.
    pub fn all_completed(&self) -> bool {
        self.years.iter().all(|y| y.status == YearStatus::Completed)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.all_completed()
    }
}

/// `(low, high)` regardless of argument order.
fn ordered(start_year: u16, end_year: u16) -> (u16, u16) {
    if start_year <= end_year {
        (start_year, end_year)
    } else {
        (end_year, start_year)
    }
}

/// Ingest every year in `start_year..=end_year`, newest first, into the JSON
/// array at `path`.
///
/// A failing year is recorded and the range moves on. The only error is an
/// output file that cannot be opened.
pub async fn ingest_range<S: RecordSource + ?Sized>(
    source: &S,
    start_year: u16,
    end_year: u16,
    path: impl AsRef<Path>,
    cfg: &IngestConfig,
) -> Result<RangeSummary, IngestError> {
    ensure_metrics_described();

    let (low, high) = ordered(start_year, end_year);
    let started_at = Utc::now();
    let mut writer = AppendWriter::open(path).await?;

    tracing::info!(
        target: "ingest",
        source = source.name(),
        start_year = low,
        end_year = high,
        out = %writer.path().display(),
        "range ingest started"
    );

    let mut years = Vec::with_capacity(usize::from(high - low) + 1);
    let mut failures = Vec::new();

    for year in (low..=high).rev() {
        let (report, status, error) = match ingest_year(source, &mut writer, year, cfg).await {
            Ok(report) => (report, YearStatus::Completed, None),
            Err(failure) => {
                let status = match failure.kind() {
                    FailureKind::Aborted => YearStatus::Aborted,
                    _ => YearStatus::Failed,
                };
                let message = failure.to_string();
                tracing::error!(target: "ingest", year, error = %message, "year did not complete");
                let kind = failure.kind();
                let fatal = matches!(failure, YearFailure::Fatal { .. });
                let mut report = failure.into_report();
                if fatal {
                    report.failures.push(RecordFailure {
                        year,
                        sequence: None,
                        kind,
                        message: message.clone(),
                    });
                }
                (report, status, Some(message))
            }
        };
        counter!("ingest_years_total", "status" => status.as_str()).increment(1);

        let YearReport {
            year,
            upper_bound,
            written,
            failures: year_failures,
            ..
        } = report;
        years.push(YearSummary {
            year,
            upper_bound,
            written,
            status,
            error,
        });
        failures.extend(year_failures);
    }

    let finished_at = Utc::now();
    gauge!("ingest_last_run_ts").set(finished_at.timestamp().max(0) as f64);

    let summary = RangeSummary {
        start_year: low,
        end_year: high,
        started_at,
        finished_at,
        years,
        failures,
    };
    tracing::info!(
        target: "ingest",
        written = summary.total_written(),
        failures = summary.failures.len(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "range ingest finished"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearBound {
    pub year: u16,
    pub upper_bound: Option<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurveySummary {
    pub years: Vec<YearBound>,
    /// Sum of the upper bounds that were found.
    pub total_possible: u64,
}

/// Probe-only pass: the upper bound of every year in the range, newest first.
pub async fn survey_range<S: RecordSource + ?Sized>(
    source: &S,
    start_year: u16,
    end_year: u16,
    cfg: &IngestConfig,
) -> SurveySummary {
    ensure_metrics_described();

    let (low, high) = ordered(start_year, end_year);
    let mut years = Vec::with_capacity(usize::from(high - low) + 1);
    let mut total_possible = 0u64;

    for year in (low..=high).rev() {
        match find_upper_bound(source, year, cfg).await {
            Ok(ub) => {
                total_possible += u64::from(ub);
                years.push(YearBound {
                    year,
                    upper_bound: Some(ub),
                    error: None,
                });
            }
            Err(e) => {
                tracing::warn!(target: "ingest", year, error = %e, "survey failed for year");
                years.push(YearBound {
                    year,
                    upper_bound: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    SurveySummary {
        years,
        total_possible,
    }
}
