//! Distributed row smoothing.
//!
//! Splits an image's rows across a fixed set of ranks, moves each rank's
//! share of the three color planes to it, filters locally and gathers the
//! results back on the coordinator.
//!
//! # Architecture
//!
//! ```text
//! pipeline::smooth_bitmap / smooth_file
//!     └── cluster::run_ranks (one thread per rank, no shared buffers)
//!             └── Orchestrator<T: Transport>  (Role x Phase state machine)
//!                     ├── Planner          (coordinator only)
//!                     ├── Transport        (send/recv metadata, scatter, gather)
//!                     │       └── LocalTransport (rendezvous channels)
//!                     └── rowblur_ops::filter (per-rank kernel)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rowblur_compute::{JobConfig, smooth_file};
//!
//! let config = JobConfig::new(2, 4)?;
//! smooth_file("in.bmp", "out.bmp", &config)?;
//! ```

pub mod cluster;
pub mod orchestrator;
pub mod pipeline;
pub mod planner;
pub mod transport;

pub use cluster::run_ranks;
pub use orchestrator::{JobConfig, Orchestrator, Phase, Role, Sink, Source};
pub use pipeline::{smooth_bitmap, smooth_file};
pub use planner::{PartitionMetadata, PartitionPlan, Planner};
pub use transport::{local_mesh, LocalTransport, Transport, ROOT};

use thiserror::Error;

/// Errors raised while running a distributed job.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rank {peer} disconnected")]
    Disconnected { peer: usize },

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Rank {0} panicked")]
    RankPanicked(usize),

    #[error("Failed to start rank {rank}: {source}")]
    Spawn {
        rank: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] rowblur_io::IoError),

    #[error(transparent)]
    Ops(#[from] rowblur_ops::OpsError),

    #[error(transparent)]
    Core(#[from] rowblur_core::Error),
}

pub type ComputeResult<T> = Result<T, ComputeError>;
