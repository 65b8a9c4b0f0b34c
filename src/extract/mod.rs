//! # Source extractors
//!
//! One extractor per (browser, artefact) pair. An extractor locates its store
//! inside a profile, opens it, maps every row or document entry into
//! [`Artefact`] records and closes the store again before returning.
//!
//! Failures stay local: a missing store is [`ExtractError::NotFound`], a
//! store that cannot be opened or queried fails the extractor as a whole,
//! and a row or JSON list entry that does not decode is logged and skipped.

pub mod chrome;
pub mod firefox;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::artefact::{Artefact, Browser};
use crate::discovery::ProfilePaths;
use crate::parsers::ParseError;
use crate::store::{Row, SqliteStore};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("query failed: {0}")]
    Query(rusqlite::Error),
    #[error("row decode failed: {0}")]
    RowDecode(String),
    #[error("invalid format: {0}")]
    Format(String),
    #[error("decompression failed: {0}")]
    Decompression(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for ExtractError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(e) => ExtractError::Io(e),
            ParseError::Format(msg) => ExtractError::Format(msg),
            ParseError::Decompression(msg) => ExtractError::Decompression(msg),
        }
    }
}

pub trait Extractor: Send + Sync {
    fn browser(&self) -> Browser;

    /// Short artefact label used in logs, e.g. `history`.
    fn name(&self) -> &'static str;

    fn extract(&self, profile: &ProfilePaths) -> Result<Vec<Artefact>, ExtractError>;
}

/// Extractors backed by one SQL query.
pub trait RowExtractor: Extractor {
    fn query(&self) -> &'static str;

    /// Map one row. May return several records (one per timestamp kind).
    fn map_row(&self, row: &Row) -> Result<Vec<Artefact>, ExtractError>;
}

/// Extractors backed by one JSON document.
pub trait JsonExtractor: Extractor {
    type Document: DeserializeOwned;

    fn map_document(&self, doc: Self::Document) -> Vec<Artefact>;
}

/// Run a [`RowExtractor`] against an already open store.
///
/// A row that fails to decode is logged and skipped, the remaining rows are
/// still mapped.
pub fn extract_rows<E: RowExtractor + ?Sized>(
    extractor: &E,
    store: &SqliteStore,
) -> Result<Vec<Artefact>, ExtractError> {
    extract_query(extractor, store, extractor.query())
}

/// Like [`extract_rows`] with a query chosen at runtime, for stores whose
/// schema differs between browser versions.
pub fn extract_query<E: RowExtractor + ?Sized>(
    extractor: &E,
    store: &SqliteStore,
    sql: &str,
) -> Result<Vec<Artefact>, ExtractError> {
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for row in store.rows(sql)? {
        match row.and_then(|row| extractor.map_row(&row)) {
            Ok(records) => out.extend(records),
            Err(err) => {
                skipped += 1;
                warn!(
                    source = %source_label(extractor),
                    path = %store.path().display(),
                    "skipping row: {err}"
                );
            }
        }
    }

    if skipped > 0 {
        warn!(
            source = %source_label(extractor),
            "skipped {skipped} rows in {}",
            store.path().display()
        );
    }
    info!(
        source = %source_label(extractor),
        "found {} records in {}",
        out.len(),
        store.path().display()
    );
    Ok(out)
}

pub fn extract_sqlite<E: RowExtractor + ?Sized>(
    extractor: &E,
    path: &Path,
) -> Result<Vec<Artefact>, ExtractError> {
    let store = SqliteStore::open(path)?;
    extract_rows(extractor, &store)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ExtractError::Format(format!("{}: {e}", path.display())))
}

pub fn extract_json<E: JsonExtractor + ?Sized>(
    extractor: &E,
    path: &Path,
) -> Result<Vec<Artefact>, ExtractError> {
    let doc = read_json::<E::Document>(path)?;
    let out = extractor.map_document(doc);
    info!(
        source = %source_label(extractor),
        "found {} records in {}",
        out.len(),
        path.display()
    );
    Ok(out)
}

/// Decode the entries of a JSON list one at a time. An entry that does not
/// fit `T` is logged and skipped; its siblings are kept.
pub fn decode_entries<E, T>(extractor: &E, entries: Vec<serde_json::Value>) -> Vec<T>
where
    E: Extractor + ?Sized,
    T: DeserializeOwned,
{
    let mut out = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;

    for (idx, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<T>(entry) {
            Ok(decoded) => out.push(decoded),
            Err(err) => {
                skipped += 1;
                warn!(source = %source_label(extractor), "skipping entry {idx}: {err}");
            }
        }
    }

    if skipped > 0 {
        warn!(source = %source_label(extractor), "skipped {skipped} entries");
    }
    out
}

pub fn source_label<E: Extractor + ?Sized>(extractor: &E) -> String {
    format!("{}::{}", extractor.browser().as_str(), extractor.name())
}

/// Run one extractor, turning every failure into an empty result.
pub fn run_extractor(extractor: &dyn Extractor, profile: &ProfilePaths) -> Vec<Artefact> {
    match extractor.extract(profile) {
        Ok(records) => records,
        Err(ExtractError::NotFound(path)) => {
            info!(source = %source_label(extractor), "not found: {}", path.display());
            Vec::new()
        }
        Err(err) => {
            error!(source = %source_label(extractor), "extraction failed: {err}");
            Vec::new()
        }
    }
}

/// Extractors of one browser, in invocation order.
pub fn registry(browser: Browser) -> Vec<Box<dyn Extractor>> {
    match browser {
        Browser::Chrome => chrome::extractors(),
        Browser::Firefox => firefox::extractors(),
    }
}

/// Immediate subdirectories of `dir`, sorted by name.
pub(crate) fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

/// Regular files directly inside `dir`, sorted by name.
pub(crate) fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}
