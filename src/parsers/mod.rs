pub mod cache2;
pub mod mozlz4;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid format: {0}")]
    Format(String),
    #[error("decompression failed: {0}")]
    Decompression(String),
}
