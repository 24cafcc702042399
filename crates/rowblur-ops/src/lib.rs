//! # rowblur-ops
//!
//! The smoothing kernel applied by every rank.
//!
//! - [`filter`] - flattened averaging window over a single byte plane
//!
//! ```rust
//! use rowblur_ops::filter::smooth;
//!
//! let plane = vec![90u8; 16];
//! let out = smooth(&plane, 16, 4, 4, 0).unwrap();
//! assert_eq!(out[8], 90);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod filter;

pub use error::{OpsError, OpsResult};
