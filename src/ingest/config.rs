// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "ROLLCALL_CONFIG_PATH";
pub const ENV_BASE_URL: &str = "ROLLCALL_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://clerk.house.gov/evs";
pub const DEFAULT_SCAN_CEILING: u32 = 2_000;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_scan_ceiling() -> u32 {
    DEFAULT_SCAN_CEILING
}
fn default_probe_window() -> usize {
    4
}
fn default_fetch_concurrency() -> usize {
    4
}
fn default_max_retries() -> u8 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_user_agent() -> String {
    concat!("rollcall-ingest/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Operational knobs for probing and fetching. The absence-run length and the
/// fetch-failure abort run are fixed at 3 and are not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Highest sequence the upper-bound scan may probe before giving up.
    #[serde(default = "default_scan_ceiling")]
    pub scan_ceiling: u32,
    /// Probes issued ahead of the confirmed boundary. 1 = strictly sequential.
    #[serde(default = "default_probe_window")]
    pub probe_window: usize,
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Attempts per request, first one included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scan_ceiling: default_scan_ceiling(),
            probe_window: default_probe_window(),
            fetch_concurrency: default_fetch_concurrency(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl IngestConfig {
    /// Clamp values that would stall or disable the pipeline.
    pub fn sanitized(mut self) -> Self {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            self.base_url = default_base_url();
        }
        if self.scan_ceiling == 0 {
            self.scan_ceiling = default_scan_ceiling();
        }
        self.probe_window = self.probe_window.clamp(1, 64);
        self.fetch_concurrency = self.fetch_concurrency.clamp(1, 64);
        self.max_retries = self.max_retries.max(1);
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        self
    }

    /// `ROLLCALL_BASE_URL` wins over the file value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<IngestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading ingest config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing ingest config {}", path.display()))?;
    Ok(cfg.with_env_overrides().sanitized())
}

/// Load config using env var + fallbacks:
/// 1) $ROLLCALL_CONFIG_PATH
/// 2) config/ingest.toml
/// 3) config/ingest.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<IngestConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/ingest.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/ingest.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(IngestConfig::default().with_env_overrides().sanitized())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<IngestConfig> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).context("invalid JSON ingest config");
    }
    toml::from_str(s).context("invalid TOML ingest config")
}
