//! Confinement Executor
//!
//! Owns a piece of state on a single tokio task and runs closures against it
//! one at a time, in the order they were submitted.

use std::future::Future;

use tokio::runtime::{Builder, Handle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

// == Executor Provider ==
/// Where the confinement worker runs.
#[derive(Debug, Clone, Default)]
pub enum ExecutorProvider {
    /// A dedicated single-threaded runtime on its own OS thread. The runtime
    /// shuts down once the last handle to the worker is dropped.
    #[default]
    CreateNew,
    /// A caller-supplied runtime. The worker is spawned on it as a task and
    /// the runtime itself is never shut down by the cache.
    Shared(Handle),
}

// == Confined ==
/// Handle to state confined to one worker task.
///
/// Cloning the handle shares the same worker. The worker stops after the
/// last handle is dropped and every queued job has run.
pub struct Confined<S> {
    sender: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Confined<S>
where
    S: Send + 'static,
{
    /// Moves `state` onto a new worker provisioned by `provider`.
    ///
    /// # Errors
    /// Returns `CacheError::Executor` if the dedicated runtime or its thread
    /// cannot be created.
    pub fn spawn(state: S, provider: ExecutorProvider) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();

        match provider {
            ExecutorProvider::Shared(handle) => {
                handle.spawn(run_worker(state, receiver));
            }
            ExecutorProvider::CreateNew => {
                let runtime = Builder::new_current_thread().enable_all().build()?;
                std::thread::Builder::new()
                    .name("kv-cache-worker".to_string())
                    .spawn(move || runtime.block_on(run_worker(state, receiver)))?;
            }
        }

        Ok(Self { sender })
    }

    // == Execute ==
    /// Queues `job` and returns immediately.
    ///
    /// Jobs submitted to a stopped worker are dropped with a warning.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.sender.send(Box::new(job)).is_err() {
            warn!("Cache worker stopped, dropping command");
        }
    }

    // == Call ==
    /// Queues `job` and returns a future resolving to its result.
    ///
    /// The job is queued when `call` is invoked, not when the future is first
    /// polled, so it keeps its place relative to jobs submitted afterwards.
    /// Dropping the future does not cancel the job.
    pub fn call<F, R>(&self, job: F) -> impl Future<Output = Result<R>> + Send + 'static
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job<S> = Box::new(move |state: &mut S| {
            // Caller may have dropped the future
            let _ = reply.send(job(state));
        });
        let queued = self.sender.send(job).is_ok();

        async move {
            if !queued {
                return Err(CacheError::WorkerStopped("command rejected".to_string()));
            }
            response
                .await
                .map_err(|_| CacheError::WorkerStopped("command dropped".to_string()))
        }
    }

    /// Returns `false` once the worker has stopped.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Returns a handle that does not keep the worker alive.
    pub fn downgrade(&self) -> WeakConfined<S> {
        WeakConfined {
            sender: self.sender.downgrade(),
        }
    }
}

// == Weak Confined ==
/// Non-owning handle to a confined worker.
///
/// Upgrading fails once every `Confined` handle is gone, at which point the
/// worker drains its queue and stops.
pub struct WeakConfined<S> {
    sender: mpsc::WeakUnboundedSender<Job<S>>,
}

impl<S> WeakConfined<S> {
    pub fn upgrade(&self) -> Option<Confined<S>> {
        self.sender.upgrade().map(|sender| Confined { sender })
    }
}

impl<S> Clone for WeakConfined<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S> std::fmt::Debug for WeakConfined<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakConfined").finish_non_exhaustive()
    }
}

impl<S> Clone for Confined<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Confined<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Confined")
            .field("running", &!self.sender.is_closed())
            .finish()
    }
}

/// Drains the job queue against `state` until every sender is gone.
async fn run_worker<S>(mut state: S, mut receiver: mpsc::UnboundedReceiver<Job<S>>) {
    info!("Cache worker started");

    let mut processed: u64 = 0;
    while let Some(job) = receiver.recv().await {
        job(&mut state);
        processed += 1;
    }

    debug!("Cache worker processed {} commands", processed);
    info!("Cache worker stopped");
}
