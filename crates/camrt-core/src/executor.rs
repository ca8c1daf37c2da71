//! Execution contexts for provider resolution and teardown
//!
//! Provider functions may block on hardware enumeration, so the lifecycle
//! never runs them while holding its state lock. Instead it hands a task to an
//! [`Executor`]. Which executor is used only changes who blocks; the observable
//! state transitions are identical.
//!
//! - [`DirectExecutor`] - runs the task on the calling thread before returning
//! - [`ThreadExecutor`] - runs each task on a fresh named OS thread
//! - [`TokioExecutor`] - runs each task on a runtime's blocking pool

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

/// A unit of work handed to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a task, now or later
pub trait Executor: Send + Sync + fmt::Debug {
    /// Schedule `task` for execution. The task must eventually run exactly once.
    fn execute(&self, task: Task);

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Runs tasks synchronously on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) {
        task();
    }

    fn name(&self) -> &str {
        "direct"
    }
}

/// Spawns one named OS thread per task
#[derive(Debug)]
pub struct ThreadExecutor {
    prefix: String,
    spawned: AtomicUsize,
}

impl ThreadExecutor {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("camrt-worker")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let task = RunOnDrop::new(task);

        // A refused spawn drops the closure, which runs the task right here
        let spawned = std::thread::Builder::new()
            .name(format!("{}-{}", self.prefix, n))
            .spawn(move || task.run());
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "Failed to spawn worker thread, ran task inline");
        }
    }

    fn name(&self) -> &str {
        &self.prefix
    }
}

/// Task wrapper that still runs the task when dropped before [`run`](Self::run)
///
/// Executors hand this to machinery that may discard work (a runtime shutting
/// down, a failed thread spawn) so the task runs exactly once regardless.
struct RunOnDrop(Option<Task>);

impl RunOnDrop {
    fn new(task: Task) -> Self {
        Self(Some(task))
    }

    fn run(mut self) {
        if let Some(task) = self.0.take() {
            task();
        }
    }
}

impl Drop for RunOnDrop {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            tracing::warn!("Executor discarded a task, running it on the dropping thread");
            task();
        }
    }
}

/// Runs tasks on the blocking pool of a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor bound to the runtime the caller is running on, if any
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        // Detached; completion is reported through the lifecycle's own handles.
        // A runtime that already shut down drops the closure unrun.
        let task = RunOnDrop::new(task);
        drop(self.handle.spawn_blocking(move || task.run()));
    }

    fn name(&self) -> &str {
        "tokio-blocking"
    }
}

/// Executor used when a configuration does not supply one
///
/// Prefers the blocking pool of the current tokio runtime and falls back to
/// dedicated threads outside of one.
pub fn default_executor() -> Arc<dyn Executor> {
    match TokioExecutor::try_current() {
        Some(executor) => Arc::new(executor),
        None => Arc::new(ThreadExecutor::default()),
    }
}
