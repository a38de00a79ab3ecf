// src/ingest/mod.rs
pub mod bound;
pub mod config;
pub mod decode;
pub mod error;
pub mod providers;
pub mod range;
pub mod retry;
pub mod types;
pub mod writer;
pub mod year;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use bound::{find_upper_bound, scan_upper_bound, UpperBound, ABSENCE_RUN};
pub use config::IngestConfig;
pub use error::{FailureKind, IngestError, YearFailure};
pub use range::{ingest_range, survey_range, RangeSummary, SurveySummary, YearStatus};
pub use types::{Presence, RecordSource};
pub use writer::AppendWriter;
pub use year::{ingest_year, ingest_year_to_path, RecordFailure, YearReport};

/// One-time metrics registration (so series carry descriptions when exported).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_probes_total", "Existence probes answered.");
        describe_counter!(
            "ingest_probe_misses_total",
            "Probes that reported the record as absent."
        );
        describe_counter!(
            "ingest_records_written_total",
            "Vote records appended to the output file."
        );
        describe_counter!(
            "ingest_record_failures_total",
            "Records skipped after a fetch or decode failure, by kind."
        );
        describe_counter!("ingest_years_total", "Years processed, by final status.");
        describe_histogram!("ingest_fetch_ms", "Record fetch time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when a range ingest last finished."
        );
    });
}

/// Normalize text: collapse whitespace (the feed wraps long descriptions
/// across lines) and trim. Entities are already resolved by the decoder.
pub fn normalize_text(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("valid regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws() {
        let s = "  Providing for consideration\n        of the bill\u{a0}(H.R. 2)  ";
        assert_eq!(
            normalize_text(s),
            "Providing for consideration of the bill (H.R. 2)"
        );
    }

    #[test]
    fn normalize_text_keeps_punctuation() {
        assert_eq!(normalize_text("On Passage."), "On Passage.");
        // No second round of unescaping.
        assert_eq!(normalize_text("a &lt; b"), "a &lt; b");
        assert_eq!(normalize_text(""), "");
    }
}
