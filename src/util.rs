//! # Run Orchestration
//!
//! Glue between the command line, the loaded configuration and the
//! discovery → pipeline → export stages.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::CliOptions;
use crate::config::{self, Config, LoadedConfig};
use crate::discovery;
use crate::export;
use crate::logging::LogSettings;
use crate::pipeline::{self, PipelineOptions, PipelineStats};

/// CLI flags win over config values.
pub fn apply_cli_overrides(cfg: &mut Config, cli: &CliOptions) {
    if let Some(browser) = cli.browser {
        cfg.browsers = browser.browsers();
    }
    if let Some(format) = cli.format {
        cfg.output_format = format.into();
    }
    if let Some(name) = cli.file_base_name.as_ref() {
        cfg.file_base_name = name.clone();
    }
    if let Some(start) = cli.start_date.as_ref() {
        cfg.start_date = start.clone();
    }
    if let Some(end) = cli.end_date.as_ref() {
        cfg.end_date = end.clone();
    }
    if let Some(level) = cli.verbose {
        cfg.log_level = level.as_str().to_string();
    }
    if let Some(workers) = cli.workers {
        cfg.workers = workers;
    }
    if cli.timestamp_diagnostics {
        cfg.timestamp_diagnostics = true;
    }
}

pub fn log_settings(cfg: &Config, cli: &CliOptions) -> LogSettings {
    LogSettings {
        level: cfg.log_level.clone(),
        format: cfg.log_format,
        file: cli.log_file.clone(),
    }
}

/// Create `dir` when missing and check that the export file can be opened
/// for writing there. Existing export content is left alone until export.
pub fn prepare_output(dir: &Path, output_path: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot use output directory {}", dir.display()))?;
    if output_path.is_dir() {
        bail!("export target {} is a directory", output_path.display());
    }
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(output_path)
        .with_context(|| format!("cannot write export file {}", output_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let shared = std::fs::metadata(dir)?.permissions().mode() & 0o002 != 0;
        if shared {
            warn!(dir = %dir.display(), "output directory is writable by every user");
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub stats: PipelineStats,
}

/// Discover, extract, filter, sort and export. Invalid dates and an
/// unwritable output location fail before any store is opened.
pub fn run(
    loaded: &LoadedConfig,
    root: &Path,
    user: Option<&str>,
    output_dir: &Path,
) -> Result<RunSummary> {
    let cfg = &loaded.config;
    let range = config::resolve_range(&cfg.start_date, &cfg.end_date)?;
    let output_path = export::output_path(output_dir, &cfg.file_base_name, cfg.output_format);
    prepare_output(output_dir, &output_path)?;

    info!(
        "starting run_id={} config_sha256={} root={} output={} workers={}",
        cfg.run_id,
        loaded.config_hash,
        root.display(),
        output_path.display(),
        cfg.workers
    );

    let targets = discovery::discover(root, &cfg.browsers, user);
    if targets.is_empty() {
        warn!("no browser profiles found under {}", root.display());
    }

    let opts = PipelineOptions {
        range,
        workers: cfg.workers.max(1),
        timestamp_diagnostics: cfg.timestamp_diagnostics,
    };
    let (records, stats) = pipeline::run_pipeline(&targets, &opts);

    export::export_records(cfg.output_format, &output_path, &records)
        .with_context(|| format!("writing {}", output_path.display()))?;
    info!(
        "wrote {} records to {}",
        records.len(),
        output_path.display()
    );

    Ok(RunSummary { output_path, stats })
}
