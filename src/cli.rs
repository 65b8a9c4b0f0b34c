use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::artefact::Browser;
use crate::export::ExportFormat;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserArg {
    All,
    Chrome,
    Firefox,
}

impl BrowserArg {
    pub fn browsers(self) -> Vec<Browser> {
        match self {
            BrowserArg::All => Browser::all().to_vec(),
            BrowserArg::Chrome => vec![Browser::Chrome],
            BrowserArg::Firefox => vec![Browser::Firefox],
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Json,
    #[value(name = "json_line")]
    JsonLine,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::JsonLine => ExportFormat::JsonLines,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    Debug,
    Info,
    Warn,
    Error,
}

impl LevelArg {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelArg::Debug => "debug",
            LevelArg::Info => "info",
            LevelArg::Warn => "warn",
            LevelArg::Error => "error",
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Browser family to extract (overrides config when set)
    #[arg(long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Restrict extraction to one user, or "all"
    #[arg(long, default_value = "all")]
    pub profile: String,

    /// Filesystem root holding the home/ and Users/ directories
    #[arg(long, default_value = "/")]
    pub root: PathBuf,

    /// Directory the export file is written to
    #[arg(long, default_value = ".")]
    pub output_directory: PathBuf,

    /// Export file name without extension
    #[arg(long)]
    pub file_base_name: Option<String>,

    /// Export format
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// First day to keep, YYYY-MM-DD
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last instant to keep, YYYY-MM-DD or "now"
    #[arg(long)]
    pub end_date: Option<String>,

    /// Write log lines to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum)]
    pub verbose: Option<LevelArg>,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Number of extraction worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Warn when one artefact type mixes timestamp magnitudes
    #[arg(long)]
    pub timestamp_diagnostics: bool,
}

impl CliOptions {
    /// The user filter, `None` when every user is wanted.
    pub fn user_filter(&self) -> Option<&str> {
        match self.profile.as_str() {
            "" | "all" => None,
            user => Some(user),
        }
    }
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_in_charge() {
        let opts = CliOptions::try_parse_from(["browser-artefacts"]).expect("parse");
        assert!(opts.browser.is_none());
        assert!(opts.format.is_none());
        assert_eq!(opts.root, PathBuf::from("/"));
        assert_eq!(opts.output_directory, PathBuf::from("."));
        assert_eq!(opts.user_filter(), None);
        assert!(!opts.timestamp_diagnostics);
    }

    #[test]
    fn parses_format_and_browser() {
        let opts = CliOptions::try_parse_from([
            "browser-artefacts",
            "--browser",
            "firefox",
            "--format",
            "json_line",
            "--verbose",
            "debug",
        ])
        .expect("parse");
        assert_eq!(opts.browser.map(BrowserArg::browsers), Some(vec![Browser::Firefox]));
        assert_eq!(opts.format.map(ExportFormat::from), Some(ExportFormat::JsonLines));
        assert_eq!(opts.verbose.map(LevelArg::as_str), Some("debug"));
    }

    #[test]
    fn parses_profile_and_range() {
        let opts = CliOptions::try_parse_from([
            "browser-artefacts",
            "--profile",
            "alice",
            "--start-date",
            "2022-01-01",
            "--end-date",
            "now",
            "--workers",
            "4",
        ])
        .expect("parse");
        assert_eq!(opts.user_filter(), Some("alice"));
        assert_eq!(opts.start_date.as_deref(), Some("2022-01-01"));
        assert_eq!(opts.end_date.as_deref(), Some("now"));
        assert_eq!(opts.workers, Some(4));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(CliOptions::try_parse_from(["browser-artefacts", "--format", "xml"]).is_err());
    }
}
