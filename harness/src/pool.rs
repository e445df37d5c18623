//! Bounded worker pool for tests that hit the daemon concurrently.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

use crate::config::EXECUTOR_WORKERS;

/// A fixed-size pool of worker threads named after the owning test.
///
/// Shutdown is fire-and-forget: in-flight tasks are abandoned, so tests
/// must not rely on completion ordering across the teardown boundary.
#[derive(Debug)]
pub struct TaskPool {
    runtime: Option<Runtime>,
}

impl TaskPool {
    pub fn new(test_name: &str) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(EXECUTOR_WORKERS)
            .thread_name(format!("{test_name}-worker"))
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.as_ref().expect("pool active").spawn(task)
    }

    /// Tear the pool down without waiting for in-flight tasks.
    pub fn shutdown(mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // shutdown_background is safe from async contexts; a plain Runtime
        // drop is not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
