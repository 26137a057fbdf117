//! Rayon thread pool configuration for batch criteria parsing.
//!
//! Use [WorkerPool::install] to parse a batch with a fixed number of threads, or rely
//! on Rayon's default (all CPU cores). The parser shares no mutable state, so any
//! worker count yields the same records.

use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};

/// Configures how many worker threads are used for parallel batch execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use Rayon default (num_cpus).
    pub workers: usize,
}

impl WorkerPool {
    /// Use exactly `n` worker threads.
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Threads a batch will run on.
    pub fn thread_count(&self) -> usize {
        if self.workers == 0 {
            rayon::current_num_threads()
        } else {
            self.workers
        }
    }

    /// Run a closure on a thread pool with this worker count. If [workers](WorkerPool::workers) is 0,
    /// uses the global Rayon pool. Otherwise builds a temporary pool with that many threads.
    pub fn install<F, R>(&self, f: F) -> Result<R, ThreadPoolBuildError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            Ok(f())
        } else {
            let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
            Ok(pool.install(f))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn fixed_pool_runs_parallel_iterators() {
        let pool = WorkerPool::with_workers(2);
        let threads = pool.install(rayon::current_num_threads).unwrap();
        assert_eq!(threads, pool.thread_count());
        let sum: u32 = pool.install(|| (1..=10u32).into_par_iter().sum()).unwrap();
        assert_eq!(sum, 55);
    }

    #[test]
    fn default_pool_uses_global_rayon() {
        let pool = WorkerPool::default();
        assert_eq!(pool.install(|| 7).unwrap(), 7);
        assert_eq!(pool.thread_count(), rayon::current_num_threads());
    }
}
