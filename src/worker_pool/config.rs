use std::time::Duration;

use crate::utils::{
    DEFAULT_MONITOR_INTERVAL, DEFAULT_SETTLE_INTERVAL, DEFAULT_TASK_TIMEOUT,
    default_max_concurrency,
};

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum tasks executing at once (default: 2 x hardware threads)
    pub max_concurrency: usize,
    /// Wall-clock budget per task; exceeded tasks are aborted (default: 1 hour)
    pub task_timeout: Duration,
    /// How long the pool must stay idle with no new submissions before
    /// `await_idle` returns (default: 500ms)
    pub settle_interval: Duration,
    /// Period of the progress log line; `None` disables it (default: 10s)
    pub monitor_interval: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            monitor_interval: Some(DEFAULT_MONITOR_INTERVAL),
        }
    }
}
