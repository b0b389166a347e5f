use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// `submit` after `shutdown`
    #[error("Worker pool is shut down")]
    Closed,
}

/// Why a task did not succeed. Reported to the monitor, never propagated to
/// sibling tasks.
#[derive(Debug, thiserror::Error)]
pub enum TaskFailure {
    /// The task body returned an error
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The task exceeded the per-task wall-clock budget and was aborted
    #[error("Task exceeded its {0:?} budget and was aborted")]
    TimedOut(Duration),

    #[error("Task panicked: {0}")]
    Panicked(String),

    /// No execution context could be created for the task
    #[error("Failed to create execution context: {0:#}")]
    ContextUnavailable(anyhow::Error),
}

impl TaskFailure {
    /// The task's own error, when there is one
    #[must_use]
    pub fn source_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Failed(e) | Self::ContextUnavailable(e) => Some(e),
            Self::TimedOut(_) | Self::Panicked(_) => None,
        }
    }
}
