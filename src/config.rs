use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::artefact::Browser;
use crate::export::ExportFormat;
use crate::logging::LogFormat;
use crate::pipeline::TimeRange;
use crate::timestamp;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub run_id: String,
    pub browsers: Vec<Browser>,
    pub start_date: String,
    pub end_date: String,
    pub output_format: ExportFormat,
    pub file_base_name: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub workers: usize,
    pub timestamp_diagnostics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_id: String::new(),
            browsers: Browser::all().to_vec(),
            start_date: "2000-01-01".to_string(),
            end_date: "now".to_string(),
            output_format: ExportFormat::Json,
            file_base_name: "BrowserArtifacts".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            workers: 1,
            timestamp_diagnostics: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p).with_context(|| format!("reading config {}", p.display()))?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes).context("parsing config")?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig { config, config_hash })
}

/// Parse a range bound: `YYYY-MM-DD` is midnight UTC of that day, `now` is
/// `now`.
pub fn parse_date_bound(value: &str, now: &DateTime<Utc>) -> Result<i64> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(timestamp::from_datetime(now));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date {value:?}, expected YYYY-MM-DD or now"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid date {value:?}"))?
        .and_utc();
    Ok(timestamp::from_datetime(&midnight))
}

pub fn resolve_range(start: &str, end: &str) -> Result<TimeRange> {
    let now = Utc::now();
    let start_us = parse_date_bound(start, &now)?;
    let end_us = parse_date_bound(end, &now)?;
    if start_us > end_us {
        bail!("start date {start} is after end date {end}");
    }
    Ok(TimeRange::new(start_us, end_us))
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn generate_run_id() -> String {
    let now = Utc::now();
    format!("{}_{}", now.format("%Y%m%dT%H%M%SZ"), rand_suffix())
}

fn rand_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{:08x}", nanos)
}
