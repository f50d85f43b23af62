//! Parallel processing utilities.
//!
//! Parsing is sequential; everything after it works on independent features
//! or transcripts. Per-feature checks go through Rayon, sequence fetches go
//! through a small bounded pool because each job may block on I/O.

use crate::error::Result;
use crossbeam_channel::{bounded, unbounded};
use rayon::prelude::*;
use std::thread;

/// Minimum number of items before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 1_000;

/// Map `f` over `items`, in parallel for large inputs. The first error
/// aborts the map.
pub fn try_map<T, U, F>(items: &[T], f: F) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync + Send,
{
    if items.len() < PARALLEL_THRESHOLD {
        items.iter().map(f).collect()
    } else {
        items.par_iter().map(f).collect()
    }
}

/// Run `f` on every job with at most `workers` threads.
///
/// Jobs are fed through a bounded channel so a slow worker never has more
/// than a couple of queued jobs waiting. Results come back in completion
/// order.
pub fn run_bounded_pool<T, U, F>(jobs: Vec<T>, workers: usize, f: F) -> Vec<U>
where
    T: Send,
    U: Send,
    F: Fn(T) -> U + Sync,
{
    let workers = workers.max(1);
    let (job_tx, job_rx) = bounded::<T>(workers * 2);
    let (result_tx, result_rx) = unbounded::<U>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let f = &f;
            scope.spawn(move || {
                for job in job_rx {
                    if result_tx.send(f(job)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        for job in jobs {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);

        result_rx.iter().collect()
    })
}
