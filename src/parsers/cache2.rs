//! Firefox `cache2` entry parser.
//!
//! Each file under `cache2/entries/` holds the cached body, a table of chunk
//! hashes and a metadata block, followed by a 4-byte big-endian offset of
//! that metadata block:
//!
//! ```text
//! [ data ............ ][ u32 hash ][ u16 * chunks ][ metadata ][ ... ][ u32 offset ]
//!                     ^ offset
//! ```
//!
//! The metadata block starts with seven big-endian `u32` fields (version,
//! fetch count, last fetched, last modified, frecency, expiration, key
//! length) followed by the key bytes.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::artefact::{Artefact, ArtefactType, TimestampKind};
use crate::parsers::ParseError;
use crate::timestamp::{EpochKind, TimeUnit, normalize, normalize_opt};

pub const CHUNK_SIZE: u64 = 256 * 1024;

const TRAILER_LEN: u64 = 4;
const METADATA_HASH_LEN: u64 = 4;
const CHUNK_HASH_LEN: u64 = 2;
const FIXED_FIELDS_LEN: u64 = 7 * 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryMetadata {
    pub version: u32,
    pub fetch_count: u32,
    /// Seconds since the Unix epoch.
    pub last_fetched: u32,
    /// Seconds since the Unix epoch.
    pub last_modified: u32,
    pub frecency: u32,
    /// Seconds since the Unix epoch.
    pub expiration: u32,
    pub key: Vec<u8>,
}

pub fn hash_chunk_count(metadata_offset: u32) -> u64 {
    (metadata_offset as u64).div_ceil(CHUNK_SIZE)
}

pub fn parse_entry_file(path: &Path) -> Result<CacheEntryMetadata, ParseError> {
    let file = File::open(path)?;
    parse_entry(BufReader::new(file))
}

pub fn parse_entry<R: Read + Seek>(mut reader: R) -> Result<CacheEntryMetadata, ParseError> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    if file_len < TRAILER_LEN {
        return Err(ParseError::Format(format!(
            "cache entry too short ({file_len} bytes)"
        )));
    }

    reader.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
    let metadata_offset = read_u32_be(&mut reader)?;

    let fields_start = metadata_offset as u64
        + METADATA_HASH_LEN
        + hash_chunk_count(metadata_offset) * CHUNK_HASH_LEN;
    if fields_start + FIXED_FIELDS_LEN > file_len {
        return Err(ParseError::Format(format!(
            "metadata offset {metadata_offset} beyond end of file ({file_len} bytes)"
        )));
    }
    reader.seek(SeekFrom::Start(fields_start))?;

    let version = read_u32_be(&mut reader)?;
    let fetch_count = read_u32_be(&mut reader)?;
    let last_fetched = read_u32_be(&mut reader)?;
    let last_modified = read_u32_be(&mut reader)?;
    let frecency = read_u32_be(&mut reader)?;
    let expiration = read_u32_be(&mut reader)?;
    let key_len = read_u32_be(&mut reader)? as u64;

    if fields_start + FIXED_FIELDS_LEN + key_len > file_len {
        return Err(ParseError::Format(format!(
            "key length {key_len} exceeds file size"
        )));
    }
    let mut key = vec![0u8; key_len as usize];
    reader.read_exact(&mut key)?;

    Ok(CacheEntryMetadata {
        version,
        fetch_count,
        last_fetched,
        last_modified,
        frecency,
        expiration,
        key,
    })
}

impl CacheEntryMetadata {
    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// The requested URL inside the cache key.
    ///
    /// Keys look like `a,:https://host/path` or
    /// `O^partitionKey=...,a,:https://host/path`: the URL follows the last
    /// `,:` separator. Keys without one are returned unchanged.
    pub fn url(&self) -> String {
        let key = self.key_lossy();
        match key.rfind(",:") {
            Some(pos) => key[pos + 2..].to_string(),
            None => key,
        }
    }

    /// One `lastFetch` record, plus a `lastModified` record when the two
    /// instants differ and the modification time is known. Both fields are
    /// seconds and are converted the same way.
    pub fn to_artefacts(&self) -> Vec<Artefact> {
        let mut payload = Artefact::new(ArtefactType::Cache);
        payload.url = Some(self.url());
        payload.metadata = Some(self.key_lossy());
        payload.visit_count = Some(self.fetch_count as i64);
        payload.cached = Some(true);

        let fetched = normalize(self.last_fetched as i64, EpochKind::Unix, TimeUnit::Seconds);
        if self.last_fetched == self.last_modified {
            return vec![payload.at(TimestampKind::LastFetchModified, fetched)];
        }
        let modified = normalize_opt(
            Some(self.last_modified as i64),
            EpochKind::Unix,
            TimeUnit::Seconds,
        );
        payload.fan_out([
            (TimestampKind::LastFetch, Some(fetched)),
            (TimestampKind::LastModified, modified),
        ])
    }
}

fn read_u32_be<R: Read>(reader: &mut R) -> Result<u32, ParseError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}
