//! Task lifecycle reporting

use std::time::Duration;
use tracing::{debug, warn};

use super::errors::TaskFailure;

/// Receives a report at each task lifecycle point
pub trait TaskMonitor: Send + Sync {
    fn task_started(&self, label: &str);

    fn task_succeeded(&self, label: &str, elapsed: Duration);

    fn task_failed(&self, label: &str, failure: &TaskFailure);
}

/// Monitor that logs through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMonitor;

impl TaskMonitor for LoggingMonitor {
    fn task_started(&self, label: &str) {
        debug!("Task started: {label}");
    }

    fn task_succeeded(&self, label: &str, elapsed: Duration) {
        debug!("Task finished: {label} ({:.1}s)", elapsed.as_secs_f64());
    }

    fn task_failed(&self, label: &str, failure: &TaskFailure) {
        warn!("Task failed: {label}: {failure}");
    }
}
