//! Bridge between synchronous callers and the single-threaded runner
//!
//! Suites hold `Rc` state, so the run future is `!Send`. It is driven on a
//! current-thread tokio runtime inside a `LocalSet`, which also lets setup
//! hooks spawn `!Send` work of their own with `tokio::task::spawn_local`.

use std::future::Future;
use std::io;
use tokio::task::LocalSet;

/// Build a current-thread runtime with timers enabled
pub fn build_runtime() -> io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
}

/// Block on a future until it completes
///
/// Creates a fresh runtime and `LocalSet` for this call, so `!Send` tasks
/// spawned by the future can make progress. Must not be called from inside
/// another tokio runtime.
pub fn try_block_on<F>(future: F) -> io::Result<F::Output>
where
    F: Future,
{
    let runtime = build_runtime()?;
    let local_set = LocalSet::new();
    Ok(runtime.block_on(local_set.run_until(future)))
}

/// Test helper: [`try_block_on`] that panics if the runtime cannot start
#[cfg(test)]
pub(crate) fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    try_block_on(future).expect("failed to start tokio runtime")
}
