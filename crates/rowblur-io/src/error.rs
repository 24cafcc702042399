//! Error types for bitmap I/O.

use std::io;
use thiserror::Error;

/// Bitmap I/O error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Decoding error (truncated header or pixel data).
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Pixel store construction failed.
    #[error(transparent)]
    Core(#[from] rowblur_core::Error),
}

/// Result type for bitmap I/O.
pub type IoResult<T> = Result<T, IoError>;
