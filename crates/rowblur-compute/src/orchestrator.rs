//! Per-rank phase state machine.
//!
//! Every rank walks the same phases in the same order:
//!
//! ```text
//! Decode -> Plan -> Scatter -> Compute -> Gather -> Finalize -> Done
//! ```
//!
//! What a phase does depends only on the rank's [`Role`]:
//!
//! | Phase    | Coordinator                         | Worker                  |
//! |----------|-------------------------------------|-------------------------|
//! | Decode   | read the bitmap                     | -                       |
//! | Plan     | plan, send metadata to every worker | receive own metadata    |
//! | Scatter  | split planes, scatter x3            | scatter x3              |
//! | Compute  | filter own slices                   | filter own slices       |
//! | Gather   | gather x3 into full planes          | gather x3               |
//! | Finalize | reassemble, encode, release buffers | -                       |
//!
//! There is no retry and no rollback: the first error ends the rank, and
//! the dropped transport ends its peers.

use std::path::PathBuf;
use std::time::Instant;

use rowblur_core::{Channel, ColorPlane, PixelStore, PlaneSlice};
use rowblur_io::{bmp, Bitmap};
use rowblur_ops::filter::smooth_slice;
use tracing::{debug, info, trace, warn};

use crate::planner::{PartitionMetadata, Planner};
use crate::transport::{Transport, ROOT};
use crate::{ComputeError, ComputeResult};

/// Job parameters every rank knows from launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfig {
    /// Window half-width minus one; the window spans `2*(k+1)+1` bytes.
    pub kernel_size: u32,
    /// Number of ranks, coordinator included.
    pub workers: usize,
}

impl JobConfig {
    /// Validated configuration.
    pub fn new(kernel_size: u32, workers: usize) -> ComputeResult<Self> {
        let config = Self {
            kernel_size,
            workers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects a run with no ranks.
    pub fn validate(&self) -> ComputeResult<()> {
        if self.workers == 0 {
            return Err(ComputeError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which side of the protocol a rank plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decodes, plans, owns the full planes and encodes the result.
    Coordinator,
    /// Receives a partition, filters it and sends it back.
    Worker,
}

impl Role {
    /// Role of `rank` given the coordinator's rank.
    pub fn for_rank(rank: usize, root: usize) -> Self {
        if rank == root {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }
}

/// Protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Decode,
    Plan,
    Scatter,
    Compute,
    Gather,
    Finalize,
    Done,
}

impl Phase {
    /// Phase that follows this one. `Done` is terminal.
    pub fn next(self) -> Phase {
        match self {
            Phase::Decode => Phase::Plan,
            Phase::Plan => Phase::Scatter,
            Phase::Scatter => Phase::Compute,
            Phase::Compute => Phase::Gather,
            Phase::Gather => Phase::Finalize,
            Phase::Finalize => Phase::Done,
            Phase::Done => Phase::Done,
        }
    }
}

/// Where the coordinator gets its image.
#[derive(Debug, Clone)]
pub enum Source {
    /// Decode from a file.
    File(PathBuf),
    /// Use an already decoded bitmap.
    Memory(Bitmap),
}

/// Where the coordinator puts the result.
#[derive(Debug, Clone)]
pub enum Sink {
    /// Encode to a file.
    File(PathBuf),
    /// Hand the bitmap back from [`Orchestrator::run`].
    Memory,
}

/// Drives one rank through every phase.
pub struct Orchestrator<T: Transport> {
    transport: T,
    role: Role,
    config: JobConfig,
    io: Option<(Source, Sink)>,
    started: Instant,

    input: Option<Bitmap>,
    partition: Option<PartitionMetadata>,
    planes: Option<[ColorPlane; 3]>,
    slices: Vec<PlaneSlice>,
    gathered: Vec<ColorPlane>,
    output: Option<Bitmap>,
}

impl<T: Transport> Orchestrator<T> {
    /// Coordinator rank: reads from `source`, writes to `sink`.
    pub fn coordinator(transport: T, config: JobConfig, source: Source, sink: Sink) -> Self {
        Self::with_role(transport, Role::Coordinator, config, Some((source, sink)))
    }

    /// Worker rank.
    pub fn worker(transport: T, config: JobConfig) -> Self {
        Self::with_role(transport, Role::Worker, config, None)
    }

    fn with_role(
        transport: T,
        role: Role,
        config: JobConfig,
        io: Option<(Source, Sink)>,
    ) -> Self {
        Self {
            transport,
            role,
            config,
            io,
            started: Instant::now(),
            input: None,
            partition: None,
            planes: None,
            slices: Vec::with_capacity(3),
            gathered: Vec::with_capacity(3),
            output: None,
        }
    }

    /// This rank's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Partition received or planned for this rank, once past `Plan`.
    pub fn partition(&self) -> Option<&PartitionMetadata> {
        self.partition.as_ref()
    }

    /// Runs every phase to completion.
    ///
    /// The coordinator returns the filtered bitmap when its sink is
    /// [`Sink::Memory`]; every other case returns `None`.
    pub fn run(mut self) -> ComputeResult<Option<Bitmap>> {
        let mut phase = Phase::Decode;
        while phase != Phase::Done {
            phase = self.step(phase)?;
        }
        Ok(self.output.take())
    }

    /// Executes `phase` and returns the next one.
    pub fn step(&mut self, phase: Phase) -> ComputeResult<Phase> {
        trace!(rank = self.transport.rank(), role = ?self.role, ?phase, "step");
        match (self.role, phase) {
            (Role::Coordinator, Phase::Decode) => self.decode()?,
            (Role::Worker, Phase::Decode) => {}

            (Role::Coordinator, Phase::Plan) => self.plan()?,
            (Role::Worker, Phase::Plan) => {
                self.partition = Some(self.transport.recv_metadata(ROOT)?);
            }

            (_, Phase::Scatter) => self.scatter()?,
            (_, Phase::Compute) => self.compute()?,
            (_, Phase::Gather) => self.gather()?,

            (Role::Coordinator, Phase::Finalize) => self.finalize()?,
            (Role::Worker, Phase::Finalize) => {}

            (_, Phase::Done) => {}
        }
        Ok(phase.next())
    }

    fn decode(&mut self) -> ComputeResult<()> {
        self.config.validate()?;
        if self.transport.size() != self.config.workers {
            return Err(ComputeError::InvalidConfig(format!(
                "configured for {} workers but transport has {} ranks",
                self.config.workers,
                self.transport.size()
            )));
        }
        self.started = Instant::now();

        let bitmap = match self.io.as_ref().map(|(source, _)| source) {
            Some(Source::File(path)) => {
                debug!(path = %path.display(), "decoding input");
                bmp::read(path)?
            }
            Some(Source::Memory(bitmap)) => bitmap.clone(),
            None => {
                return Err(ComputeError::InvalidConfig(
                    "coordinator has no input".to_string(),
                ))
            }
        };
        info!(width = bitmap.width(), height = bitmap.height(), "decoded input");
        self.input = Some(bitmap);
        Ok(())
    }

    fn plan(&mut self) -> ComputeResult<()> {
        let input = self.require_input()?;
        let (width, height) = (input.width(), input.height());

        let planner = Planner::new(self.transport.size())?;
        let plan = planner.plan(width, height);
        debug!("partition plan\n{}", planner.describe(&plan));

        let rows = plan.uncovered_rows();
        if !rows.is_empty() || plan.uncovered_bytes() > 0 {
            warn!(
                rows = ?rows,
                bytes = plan.uncovered_bytes(),
                workers = plan.workers(),
                "image does not divide evenly; trailing data is left unfiltered"
            );
        }

        for (rank, meta) in plan.partitions.iter().enumerate() {
            if rank != ROOT {
                self.transport.send_metadata(rank, *meta)?;
            }
        }
        self.partition = plan.for_rank(ROOT).copied();
        Ok(())
    }

    fn scatter(&mut self) -> ComputeResult<()> {
        let count = self.require_partition()?.element_count;

        if self.role == Role::Coordinator {
            self.planes = Some(self.require_input()?.pixels.split());
        }

        for channel in Channel::ALL {
            let source = self.planes.as_ref().map(|p| &p[channel.index()]);
            let slice = self.transport.scatter(ROOT, source, channel, count)?;
            self.slices.push(slice);
        }
        Ok(())
    }

    fn compute(&mut self) -> ComputeResult<()> {
        let meta = *self.require_partition()?;
        let kernel_size = self.config.kernel_size;

        let slices = std::mem::take(&mut self.slices);
        for slice in slices {
            let filtered = smooth_slice(
                slice,
                meta.element_count,
                meta.width,
                meta.height,
                kernel_size,
            )?;
            self.slices.push(filtered);
        }
        debug!(
            rank = self.transport.rank(),
            rows = ?meta.rows(),
            count = meta.element_count,
            "filtered partition"
        );
        Ok(())
    }

    fn gather(&mut self) -> ComputeResult<()> {
        // Coordinator gathers into its original planes so unowned bytes
        // keep their input value.
        let mut targets: Vec<Option<ColorPlane>> = match self.planes.take() {
            Some(planes) => planes.into_iter().map(Some).collect(),
            None => vec![None, None, None],
        };

        let slices = std::mem::take(&mut self.slices);
        for (slice, target) in slices.into_iter().zip(targets.iter_mut()) {
            if let Some(plane) = self.transport.gather(ROOT, slice, target.take())? {
                self.gathered.push(plane);
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> ComputeResult<()> {
        let input = self.input.take().ok_or_else(|| missing("input"))?;
        let gathered = std::mem::take(&mut self.gathered);
        let planes: [ColorPlane; 3] = gathered.try_into().map_err(|v: Vec<ColorPlane>| {
            ComputeError::Protocol(format!("gathered {} planes, expected 3", v.len()))
        })?;

        let pixels = PixelStore::from_planes(planes)?;
        let output = input.with_pixels(pixels);
        drop(input);

        match self.io.as_ref().map(|(_, sink)| sink) {
            Some(Sink::File(path)) => {
                bmp::write(path, &output)?;
                debug!(path = %path.display(), "wrote output");
            }
            Some(Sink::Memory) => self.output = Some(output),
            None => return Err(missing("sink")),
        }

        info!(
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            workers = self.transport.size(),
            kernel_size = self.config.kernel_size,
            "smoothing finished"
        );
        Ok(())
    }

    fn require_input(&self) -> ComputeResult<&Bitmap> {
        self.input.as_ref().ok_or_else(|| missing("input"))
    }

    fn require_partition(&self) -> ComputeResult<&PartitionMetadata> {
        self.partition.as_ref().ok_or_else(|| missing("partition"))
    }
}

fn missing(what: &str) -> ComputeError {
    ComputeError::Protocol(format!("{} not available in this phase", what))
}
