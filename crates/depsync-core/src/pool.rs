//! Worker pool and lock helpers shared by the builder and the engine.

use std::sync::{Mutex, MutexGuard};

use crate::{Error, Result};

/// A rayon pool with `jobs` threads.
pub(crate) fn worker_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("depsync-worker-{}", i))
        .build()
        .map_err(|e| Error::WorkerPool {
            message: e.to_string(),
        })
}

/// Lock `mutex`, recovering the data if a worker panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
