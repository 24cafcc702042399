//! # rowblur-core
//!
//! Core types shared by every rowblur crate.
//!
//! - [`Rgb`], [`Channel`] - a single color triplet and its channel selector
//! - [`PixelStore`] - the decoded image, row-major, top-to-bottom
//! - [`ColorPlane`], [`PlaneSlice`] - owned byte buffers moved between ranks
//!
//! ## Crate Structure
//!
//! ```text
//! rowblur-core (this crate)
//!    ^
//!    |
//!    +-- rowblur-io (bitmap framing)
//!    +-- rowblur-ops (convolution kernel)
//!    +-- rowblur-compute (planner, transport, orchestrator)
//!    +-- rowblur-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod pixel;
pub mod plane;
pub mod store;

pub use error::{Error, Result};
pub use pixel::{Channel, Rgb};
pub use plane::{ColorPlane, PlaneSlice};
pub use store::PixelStore;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::pixel::{Channel, Rgb};
    pub use crate::plane::{ColorPlane, PlaneSlice};
    pub use crate::store::PixelStore;
}
