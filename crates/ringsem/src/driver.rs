//! Thread-backed partition workers.
//!
//! Each partition runs on its own named thread with one end of a fully
//! connected [`Communicator`] mesh. A worker that fails drops its
//! channels, so every peer blocked on it fails with
//! `CommError::PeerAborted`. The driver joins all workers and reports
//! the root cause: the lowest-rank error that is not such a secondary
//! failure.

use std::any::Any;
use std::thread;

use tracing::{error, info};

use ringsem_core::SolverError;
use ringsem_engine::Communicator;

use crate::preloop::{Preloop, WorkerOutput};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".into()
    }
}

/// Pick the error to report from per-rank results.
fn root_cause<T>(results: Vec<(usize, Result<T, SolverError>)>) -> Result<Vec<T>, SolverError> {
    let mut outputs = Vec::with_capacity(results.len());
    let mut secondary = None;
    let mut primary = None;
    for (rank, result) in results {
        match result {
            Ok(v) => outputs.push(v),
            Err(e) if e.is_secondary() => {
                secondary.get_or_insert((rank, e));
            }
            Err(e) => {
                primary.get_or_insert((rank, e));
            }
        }
    }
    match primary.or(secondary) {
        Some((rank, e)) => {
            error!(rank, error = %e, "run aborted");
            Err(e)
        }
        None => Ok(outputs),
    }
}

/// Run `f` on `size` connected workers and collect their results in
/// rank order.
pub fn run_workers<T, F>(size: usize, f: F) -> Result<Vec<T>, SolverError>
where
    T: Send,
    F: Fn(Communicator) -> Result<T, SolverError> + Sync,
{
    let f = &f;
    let mut results = thread::scope(|scope| {
        let mut results = Vec::with_capacity(size);
        let mut handles = Vec::with_capacity(size);
        for comm in Communicator::mesh(size.max(1)) {
            let rank = comm.rank();
            let spawned = thread::Builder::new()
                .name(format!("ringsem-worker-{rank}"))
                .spawn_scoped(scope, move || f(comm));
            match spawned {
                Ok(handle) => handles.push((rank, handle)),
                Err(e) => results.push((
                    rank,
                    Err(SolverError::Worker {
                        rank,
                        reason: format!("could not spawn thread: {e}"),
                    }),
                )),
            }
        }
        for (rank, handle) in handles {
            let result = handle.join().unwrap_or_else(|payload| {
                Err(SolverError::Worker {
                    rank,
                    reason: panic_message(payload.as_ref()),
                })
            });
            results.push((rank, result));
        }
        results
    });
    results.sort_by_key(|(rank, _)| *rank);
    root_cause(results)
}

/// Run the whole simulation on `config.partitions` workers.
pub fn run_partitioned(preloop: &Preloop) -> Result<Vec<WorkerOutput>, SolverError> {
    let size = preloop.config().partitions.max(1);
    info!(workers = size, "starting partition workers");
    run_workers(size, |comm| preloop.run(comm))
}
