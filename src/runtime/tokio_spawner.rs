//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use crate::core::Spawn;

/// Tokio-based spawner that runs consumer loops on a tokio runtime.
///
/// Spawners built with [`TokioSpawner::with_worker_threads`] or
/// [`TokioSpawner::multi_thread`] own their runtime; it lives as long as the
/// last clone.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
    runtime: Option<Arc<tokio::runtime::Runtime>>,
}

impl TokioSpawner {
    /// Create a new `TokioSpawner` from a tokio runtime handle.
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Create a `TokioSpawner` with its own multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// The runtime could not be built.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("throttle-worker")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// As [`TokioSpawner::with_worker_threads`], one worker per logical CPU.
    ///
    /// # Errors
    ///
    /// The runtime could not be built.
    pub fn multi_thread() -> Result<Self, std::io::Error> {
        Self::with_worker_threads(num_cpus::get())
    }

    /// Handle to the underlying runtime.
    pub const fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    /// Whether this spawner owns its runtime.
    pub const fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

impl std::fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.owns_runtime())
            .finish_non_exhaustive()
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
