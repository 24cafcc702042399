//! One-call entry points that launch a full set of local ranks.

use std::path::Path;

use rowblur_io::Bitmap;
use tracing::info;

use crate::cluster::run_ranks;
use crate::orchestrator::{JobConfig, Orchestrator, Role, Sink, Source};
use crate::transport::{local_mesh, Transport, ROOT};
use crate::{ComputeError, ComputeResult};

/// Smooths an in-memory bitmap across `config.workers` ranks.
///
/// The result keeps the input's headers.
pub fn smooth_bitmap(bitmap: Bitmap, config: &JobConfig) -> ComputeResult<Bitmap> {
    run(config, Source::Memory(bitmap), Sink::Memory)?
        .ok_or_else(|| ComputeError::Protocol("coordinator produced no output".to_string()))
}

/// Reads `input`, smooths it across `config.workers` ranks and writes
/// `output`.
pub fn smooth_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &JobConfig,
) -> ComputeResult<()> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();
    info!(
        input = %input.display(),
        output = %output.display(),
        workers = config.workers,
        kernel_size = config.kernel_size,
        "smoothing file"
    );
    run(config, Source::File(input), Sink::File(output)).map(|_| ())
}

fn run(config: &JobConfig, source: Source, sink: Sink) -> ComputeResult<Option<Bitmap>> {
    config.validate()?;
    let config = *config;

    let mut io = Some((source, sink));
    let ranks: Vec<_> = local_mesh(config.workers)
        .into_iter()
        .map(|transport| match Role::for_rank(transport.rank(), ROOT) {
            Role::Coordinator => match io.take() {
                Some((source, sink)) => Orchestrator::coordinator(transport, config, source, sink),
                None => Orchestrator::worker(transport, config),
            },
            Role::Worker => Orchestrator::worker(transport, config),
        })
        .collect();

    let mut outputs = run_ranks(ranks, Orchestrator::run)?;
    Ok(outputs.swap_remove(ROOT))
}
