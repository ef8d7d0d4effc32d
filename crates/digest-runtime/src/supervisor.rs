//! # Task Supervision
//!
//! Every pipeline task runs inside one [`JoinSet`]. The first fatal error (or
//! panic) aborts everything still running and is reported to the caller.
//! Non-fatal task failures are logged and the remaining tasks keep going.

use alarm_digest::DigestError;
use std::future::Future;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Runtime failures reported by the supervisor and the bootstrap.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration rejected before startup.
    #[error("Configuration error: {0}")]
    Config(#[from] alarm_digest::ConfigError),

    /// Wiring failed before any task was spawned.
    #[error("Startup failed: {0}")]
    Startup(#[from] DigestError),

    /// A task returned a fatal error.
    #[error("Task {task} failed: {source}")]
    Fatal {
        /// Task name.
        task: String,
        /// Underlying error.
        #[source]
        source: DigestError,
    },

    /// A task panicked.
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// Tasks did not drain within the shutdown grace period.
    #[error("Shutdown did not complete in time")]
    ShutdownTimeout,
}

type TaskOutcome = (String, Result<(), DigestError>);

/// Owner of all spawned pipeline tasks.
#[derive(Default)]
pub struct Supervisor {
    tasks: JoinSet<TaskOutcome>,
}

impl Supervisor {
    /// Create an empty supervisor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` under `name`.
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), DigestError>> + Send + 'static,
    {
        let name = name.into();
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Number of tasks not yet joined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether every task has been joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Join tasks until all have finished or one fails fatally.
    ///
    /// Cancel-safe: tasks not yet joined stay owned by the supervisor.
    pub async fn wait(&mut self) -> Result<(), RuntimeError> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => debug!("[supervisor] {} finished", name),
                Ok((name, Err(e))) if e.is_fatal() => {
                    error!("[supervisor] {} failed fatally: {}; aborting", name, e);
                    self.tasks.abort_all();
                    return Err(RuntimeError::Fatal {
                        task: name,
                        source: e,
                    });
                }
                Ok((name, Err(e))) => warn!("[supervisor] {} stopped: {}", name, e),
                Err(e) if e.is_cancelled() => debug!("[supervisor] task cancelled"),
                Err(e) => {
                    error!("[supervisor] task panicked: {}; aborting", e);
                    self.tasks.abort_all();
                    return Err(RuntimeError::Panicked(e.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Abort every remaining task.
    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }
}
