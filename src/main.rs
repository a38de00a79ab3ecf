//! rollcall-ingest: binary entrypoint.
//! Loads config, wires the clerk HTTP source into the range orchestrator and
//! prints the summary as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use rollcall_ingest::ingest::config::{load_config_default, load_config_from};
use rollcall_ingest::ingest::providers::clerk_http::ClerkHttpSource;
use rollcall_ingest::ingest::{ingest_range, survey_range};
use rollcall_ingest::telemetry::{init_tracing, Metrics};

#[derive(Debug, Parser)]
#[command(name = "rollcall-ingest", version, about = "Ingest roll-call vote XML into a JSON array")]
struct Args {
    /// First year of the range (inclusive)
    #[arg(long)]
    start: u16,

    /// Last year of the range (inclusive); processed first
    #[arg(long)]
    end: u16,

    /// Output JSON array file (appended to if it exists)
    #[arg(long, short, default_value = "votes.json")]
    out: PathBuf,

    /// Config file (TOML or JSON); defaults to $ROLLCALL_CONFIG_PATH or config/ingest.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the record source base URL
    #[arg(long, env = "ROLLCALL_BASE_URL")]
    base_url: Option<String>,

    /// Only probe for upper bounds; fetch and write nothing
    #[arg(long)]
    survey: bool,

    /// Write Prometheus exposition text here when done
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.log_json);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = ?e, "rollcall-ingest failed");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every year completed.
async fn run(args: Args) -> Result<bool> {
    info!("rollcall-ingest v{}", env!("CARGO_PKG_VERSION"));

    let mut cfg = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config_default()?,
    };
    if let Some(url) = args.base_url {
        cfg.base_url = url;
        cfg = cfg.sanitized();
    }

    let metrics = match &args.metrics_out {
        Some(_) => Some(Metrics::install()?),
        None => None,
    };

    let source = ClerkHttpSource::from_config(&cfg).context("building HTTP client")?;
    info!(base_url = %cfg.base_url, "record source ready");

    let clean = if args.survey {
        let survey = survey_range(&source, args.start, args.end, &cfg).await;
        println!("{}", serde_json::to_string_pretty(&survey)?);
        survey.years.iter().all(|y| y.error.is_none())
    } else {
        let summary = ingest_range(&source, args.start, args.end, &args.out, &cfg)
            .await
            .with_context(|| format!("ingesting into {}", args.out.display()))?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        for y in summary.failed_years() {
            warn!(year = y.year, status = ?y.status, written = y.written, "year incomplete");
        }
        summary.all_completed()
    };

    if let (Some(m), Some(path)) = (&metrics, &args.metrics_out) {
        m.dump_to(path)?;
    }
    Ok(clean)
}
