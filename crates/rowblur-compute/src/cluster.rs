//! Rank launcher.
//!
//! Starts one OS thread per rank and waits for all of them. Each thread owns
//! the value it is handed (its transport endpoint and any buffers) and
//! shares nothing else; ranks talk only through their transport.
//!
//! A rank that fails drops its endpoint, which turns the next blocking call
//! on every peer into [`ComputeError::Disconnected`] instead of a hang.

use std::thread;

use tracing::{debug, error};

use crate::{ComputeError, ComputeResult};

/// Runs `f` once per item, each on its own named thread, and collects the
/// results in rank order.
///
/// Returns the first error by rank if any rank failed. A rank that reports
/// `Disconnected` is usually a casualty of another rank's failure, so a
/// non-disconnect error is preferred when both are present.
pub fn run_ranks<T, R, F>(ranks: Vec<T>, f: F) -> ComputeResult<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> ComputeResult<R> + Sync,
{
    let size = ranks.len();
    debug!(size, "starting ranks");

    let outcomes: Vec<ComputeResult<R>> = thread::scope(|scope| {
        let f = &f;
        let mut handles = Vec::with_capacity(size);
        for (rank, item) in ranks.into_iter().enumerate() {
            let spawned = thread::Builder::new()
                .name(format!("rank-{}", rank))
                .spawn_scoped(scope, move || f(item));
            handles.push(spawned.map_err(|source| ComputeError::Spawn { rank, source }));
        }

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| match handle {
                Ok(h) => h.join().unwrap_or(Err(ComputeError::RankPanicked(rank))),
                Err(e) => Err(e),
            })
            .collect()
    });

    let mut results = Vec::with_capacity(size);
    let mut first_err: Option<ComputeError> = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(r) => results.push(r),
            Err(e) => {
                error!(rank, error = %e, "rank failed");
                let replace = match &first_err {
                    None => true,
                    Some(ComputeError::Disconnected { .. }) => {
                        !matches!(e, ComputeError::Disconnected { .. })
                    }
                    Some(_) => false,
                };
                if replace {
                    first_err = Some(e);
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
