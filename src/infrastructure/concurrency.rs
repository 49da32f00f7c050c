/// Concurrency management for Calltree.
/// The walk itself stays synchronous on the caller's thread; rayon is only
/// used for snapshot indexing, and the pool is sized to leave headroom for a
/// host UI thread.

use anyhow::Result;

/// Initialize the global rayon thread pool with controlled worker count.
/// Reserves ~50% of CPU capacity, minimum 1 worker.
pub fn init_thread_pool() -> Result<()> {
    let cores = num_cpus::get();
    let workers = std::cmp::max(1, cores / 2);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    log::info!(
        "initialized thread pool: {} workers (system has {} cores)",
        workers,
        cores
    );

    Ok(())
}
