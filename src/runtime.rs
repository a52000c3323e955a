//! Runtime abstraction layer for async operations
//!
//! Image loads are fire-and-forget relative to the render pass that starts them.
//! They are spawned through an [`AsyncSpawner`] so the rest of the crate never
//! names the executor directly, and every spawn hands back an [`AsyncHandle`]
//! that can abort the work if the tile that requested it is no longer needed.

use crate::prelude::BoxFuture;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning with type safety
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;
    use ::tokio::task::JoinHandle;

    /// Tokio-based async spawner.
    ///
    /// Must be used from within a tokio runtime context.
    pub struct TokioSpawner;

    impl AsyncSpawner for TokioSpawner {
        fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Box<dyn AsyncHandle> {
            let handle = ::tokio::spawn(future);
            Box::new(TokioHandle(handle))
        }
    }

    struct TokioHandle(JoinHandle<()>);

    impl AsyncHandle for TokioHandle {
        fn is_finished(&self) -> bool {
            self.0.is_finished()
        }

        fn cancel(&self) {
            self.0.abort();
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner.
///
/// Has no effect once a spawner has been installed (explicitly or by the first spawn).
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) {
    if RUNTIME.set(spawner).is_err() {
        log::debug!("runtime already initialised, keeping existing spawner");
    }
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| Box::new(spawners::TokioSpawner))
        .as_ref()
}
