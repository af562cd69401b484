//! Fan a per-file job out over a fixed-size thread pool.

use rayon::prelude::*;
use tracing::warn;

/// A pool of `workers` threads. `0` means one per available core and `1`
/// runs every job on the calling thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    #[must_use]
    pub const fn new(workers: usize) -> Self {
        Self { workers }
    }

    #[must_use]
    pub const fn workers(self) -> usize {
        self.workers
    }

    /// Run `job` over every item and return the results in input order.
    ///
    /// Jobs share nothing mutable; a job's error is just another result and
    /// does not stop its siblings.
    pub fn run_all<T, R, F>(self, items: &[T], job: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.workers == 1 || items.len() <= 1 {
            return items.iter().map(job).collect();
        }
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("selfmt-{i}"));
        if self.workers > 0 {
            builder = builder.num_threads(self.workers);
        }
        match builder.build() {
            Ok(pool) => pool.install(|| items.par_iter().map(job).collect()),
            Err(e) => {
                warn!(error = %e, "failed to start worker pool; running sequentially");
                items.iter().map(job).collect()
            }
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(0)
    }
}
