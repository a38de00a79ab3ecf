// src/ingest/error.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::year::YearReport;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network failure, timeout or non-success status. Retryable.
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Document reachable but not a roll-call vote we can decode.
    #[error("decode error for {year}/roll{sequence:03}: {reason}")]
    Decode {
        year: u16,
        sequence: u32,
        reason: String,
    },

    #[error("scan exhausted for {year}: no absence run before sequence {ceiling}")]
    ScanExhausted { year: u16, ceiling: u32 },

    #[error("write error on {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn transport(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn decode(year: u16, sequence: u32, reason: impl Into<String>) -> Self {
        Self::Decode {
            year,
            sequence,
            reason: reason.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } => FailureKind::Transport,
            Self::Decode { .. } => FailureKind::Decode,
            Self::ScanExhausted { .. } => FailureKind::ScanExhausted,
            Self::Write { .. } => FailureKind::Write,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Decode,
    ScanExhausted,
    Write,
    /// Year stopped after a run of consecutive fetch failures.
    Aborted,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::ScanExhausted => "scan_exhausted",
            Self::Write => "write",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A year that stopped early. `report` holds what was written before it did.
#[derive(Debug, Error)]
pub enum YearFailure {
    #[error("year {}: {source}", .report.year)]
    Fatal {
        report: YearReport,
        #[source]
        source: IngestError,
    },

    #[error("year {} aborted after {consecutive} consecutive fetch failures", .report.year)]
    Aborted {
        report: YearReport,
        consecutive: u32,
    },
}

impl YearFailure {
    pub fn report(&self) -> &YearReport {
        match self {
            Self::Fatal { report, .. } | Self::Aborted { report, .. } => report,
        }
    }

    pub fn into_report(self) -> YearReport {
        match self {
            Self::Fatal { report, .. } | Self::Aborted { report, .. } => report,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Fatal { source, .. } => source.kind(),
            Self::Aborted { .. } => FailureKind::Aborted,
        }
    }
}
