//! Record writers.
//!
//! Three flat formats share one sink contract: a pretty-printed JSON array,
//! JSON Lines (one object per line) and CSV with a fixed header. Sinks are
//! fed records one at a time and must be flushed once at the end.

pub mod csv;
pub mod json;
pub mod jsonl;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artefact::Artefact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "json_line")]
    JsonLines,
    #[serde(rename = "csv")]
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::JsonLines => "jsonl",
            ExportFormat::Csv => "csv",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("writer lock poisoned")]
    Poisoned,
}

pub trait ExportSink: Send + Sync {
    fn record(&self, record: &Artefact) -> Result<(), ExportError>;

    /// Write any trailer and flush. Further records are an error.
    fn flush(&self) -> Result<(), ExportError>;
}

pub fn output_path(dir: &Path, base_name: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{base_name}.{}", format.extension()))
}

pub fn build_sink(format: ExportFormat, path: &Path) -> Result<Box<dyn ExportSink>, ExportError> {
    match format {
        ExportFormat::Json => Ok(Box::new(json::JsonSink::create(path)?)),
        ExportFormat::JsonLines => Ok(Box::new(jsonl::JsonlSink::create(path)?)),
        ExportFormat::Csv => Ok(Box::new(csv::CsvSink::create(path)?)),
    }
}

/// Write `records` to `path` in `format`, in the given order.
pub fn export_records(
    format: ExportFormat,
    path: &Path,
    records: &[Artefact],
) -> Result<(), ExportError> {
    let sink = build_sink(format, path)?;
    for record in records {
        sink.record(record)?;
    }
    sink.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_uses_format_extension() {
        let dir = Path::new("/out");
        assert_eq!(
            output_path(dir, "report", ExportFormat::JsonLines),
            PathBuf::from("/out/report.jsonl")
        );
        assert_eq!(
            output_path(dir, "report", ExportFormat::Csv),
            PathBuf::from("/out/report.csv")
        );
    }

    #[test]
    fn format_names_match_config_values() {
        let format: ExportFormat = serde_yaml::from_str("json_line").expect("yaml");
        assert_eq!(format, ExportFormat::JsonLines);
        let format: ExportFormat = serde_yaml::from_str("csv").expect("yaml");
        assert_eq!(format, ExportFormat::Csv);
    }
}
