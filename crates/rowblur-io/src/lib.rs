//! Bitmap I/O for rowblur.
//!
//! Reads and writes the minimal bitmap framing consumed by the smoothing
//! pipeline: a 14-byte file header, a 40-byte frame header, then 24-bit
//! pixel rows stored bottom-to-top.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rowblur_io::bmp;
//!
//! let bitmap = bmp::read("input.bmp")?;
//! println!("{}x{}", bitmap.width(), bitmap.height());
//! bmp::write("copy.bmp", &bitmap)?;
//! ```

#![warn(missing_docs)]

pub mod bmp;
mod error;

pub use bmp::{Bitmap, FileHeader, FrameHeader};
pub use error::{IoError, IoResult};
