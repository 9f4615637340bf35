/*!
 * Conformance Driver
 *
 * Runs N workers that each enter a critical section M times through any
 * `RawLock`, then checks the shared array for torn updates.
 */

use super::shared::{SharedArray, SCALE_FACTORS};
use crate::core::errors::{LockError, LockResult};
use crate::core::sync::{RawLock, Unguarded};
use crate::monitoring::span_run;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Initial value of every cell
const INITIAL_VALUE: f64 = 1.0;

/// Workload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceDriver {
    /// Concurrent worker threads
    pub workers: usize,
    /// Critical sections per worker
    pub iterations: usize,
    /// Cells in the shared array
    pub len: usize,
    /// Yield in the middle of each section to widen race windows
    pub yield_midway: bool,
}

impl Default for ConformanceDriver {
    fn default() -> Self {
        Self {
            workers: 100,
            iterations: 100,
            len: 1000,
            yield_midway: false,
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Name of the lock the workers went through
    pub lock: String,
    /// All cells equal after the run
    pub atomic: bool,
    /// First cell disagreeing with cell 0
    pub first_mismatch: Option<usize>,
    pub workers: usize,
    pub iterations: usize,
    pub len: usize,
    pub elapsed_ms: u64,
}

impl ConformanceDriver {
    /// Run the array workload with every section guarded by `lock`
    pub fn run_guarded<L: RawLock>(&self, lock: &L) -> LockResult<ConformanceReport> {
        let span = span_run("conformance", lock.name());
        let array = SharedArray::new(self.len, INITIAL_VALUE);
        let yield_midway = self.yield_midway;

        let elapsed = self.exercise(lock, |_worker, rng| {
            let v = SCALE_FACTORS[rng.gen_range(0..SCALE_FACTORS.len())];
            array.scale_all(v, yield_midway);
        })?;

        let first_mismatch = array.first_mismatch();
        span.record_atomic(first_mismatch.is_none());
        let report = ConformanceReport {
            lock: lock.name().to_string(),
            atomic: first_mismatch.is_none(),
            first_mismatch,
            workers: self.workers,
            iterations: self.iterations,
            len: self.len,
            elapsed_ms: elapsed.as_millis().min(u64::MAX as u128) as u64,
        };

        info!(
            lock = %report.lock,
            atomic = report.atomic,
            elapsed_ms = report.elapsed_ms,
            "Conformance run finished"
        );
        Ok(report)
    }

    /// Run the same workload with no mutual exclusion at all
    pub fn run_unguarded(&self) -> LockResult<ConformanceReport> {
        self.run_guarded(&Unguarded)
    }

    /// Run `section` `iterations` times on each of `workers` threads, each
    /// call wrapped in `lock.acquire()` / `lock.release()`
    ///
    /// The section gets the worker index and a per-worker RNG.
    pub fn exercise<L, F>(&self, lock: &L, section: F) -> LockResult<Duration>
    where
        L: RawLock,
        F: Fn(usize, &mut rand::rngs::ThreadRng) + Sync,
    {
        let start = Instant::now();
        let section = &section;

        thread::scope(|s| {
            let handles: Vec<_> = (0..self.workers)
                .map(|worker| {
                    s.spawn(move || -> LockResult<()> {
                        let mut rng = rand::thread_rng();
                        for _ in 0..self.iterations {
                            lock.run_exclusive(|| section(worker, &mut rng))?;
                        }
                        debug!(worker, "Worker done");
                        Ok(())
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().map_err(panic_message)?)
                .collect::<LockResult<Vec<()>>>()
        })?;

        Ok(start.elapsed())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> LockError {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    LockError::WorkerPanicked(msg)
}
