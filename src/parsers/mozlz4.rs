//! `mozLz40` container decoding (Firefox `bookmarkbackups/*.jsonlz4`).
//!
//! Layout: 8-byte magic `mozLz40\0`, little-endian `u32` decompressed size,
//! then one raw LZ4 block running to end of file. Declared sizes above
//! [`MAX_DECODED_SIZE`] are rejected before anything is allocated.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::parsers::ParseError;

pub const MAGIC: &[u8; 8] = b"mozLz40\0";

/// Largest decompressed size accepted from a container header.
pub const MAX_DECODED_SIZE: u32 = 256 * 1024 * 1024;

pub fn decode_file(path: &Path) -> Result<Vec<u8>, ParseError> {
    let file = File::open(path)?;
    decode(BufReader::new(file))
}

pub fn decode<R: Read>(mut reader: R) -> Result<Vec<u8>, ParseError> {
    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .map_err(|_| ParseError::Format("missing mozLz40 header".to_string()))?;
    if &magic != MAGIC {
        return Err(ParseError::Format("mozLz40 magic mismatch".to_string()));
    }

    let mut size_buf = [0u8; 4];
    reader
        .read_exact(&mut size_buf)
        .map_err(|_| ParseError::Format("missing mozLz40 size field".to_string()))?;
    let size = u32::from_le_bytes(size_buf);
    if size > MAX_DECODED_SIZE {
        return Err(ParseError::Format(format!(
            "declared size {size} exceeds {MAX_DECODED_SIZE} bytes"
        )));
    }
    let declared = size as i32;

    let mut block = Vec::new();
    reader.read_to_end(&mut block)?;

    lz4::block::decompress(&block, Some(declared))
        .map_err(|e| ParseError::Decompression(e.to_string()))
}
