//! `WorkerPool` implementation

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::config::PoolConfig;
use super::errors::{PoolError, TaskFailure};
use super::monitor::{LoggingMonitor, TaskMonitor};
use super::provider::ContextProvider;
use super::stats::{PoolStats, PoolStatsSnapshot};

/// Bounded task pool. Cloning yields another handle to the same pool, which is
/// how running tasks submit follow-up work.
pub struct WorkerPool<P: ContextProvider> {
    inner: Arc<PoolInner<P>>,
}

impl<P: ContextProvider> Clone for WorkerPool<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<P: ContextProvider> {
    config: PoolConfig,
    provider: P,
    monitor: Arc<dyn TaskMonitor>,
    /// One permit per concurrently executing task
    slots: Arc<Semaphore>,
    /// Submitted tasks that have not finished (queued + running)
    outstanding: watch::Sender<usize>,
    cancel: watch::Sender<bool>,
    closed: AtomicBool,
    stats: PoolStats,
    monitor_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Decrements the outstanding counter when a task wrapper ends, however it ends
struct OutstandingGuard<P: ContextProvider>(Arc<PoolInner<P>>);

impl<P: ContextProvider> Drop for OutstandingGuard<P> {
    fn drop(&mut self) {
        self.0
            .outstanding
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}

enum Outcome {
    Succeeded,
    Failed(TaskFailure),
    Cancelled,
}

impl<P: ContextProvider> WorkerPool<P> {
    /// Create a pool that reports through [`LoggingMonitor`]
    #[must_use]
    pub fn new(config: PoolConfig, provider: P) -> Self {
        Self::with_monitor(config, provider, Arc::new(LoggingMonitor))
    }

    #[must_use]
    pub fn with_monitor(config: PoolConfig, provider: P, monitor: Arc<dyn TaskMonitor>) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        let (outstanding, _) = watch::channel(0);
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(PoolInner {
                config,
                provider,
                monitor,
                slots,
                outstanding,
                cancel,
                closed: AtomicBool::new(false),
                stats: PoolStats::default(),
                monitor_handle: Mutex::new(None),
            }),
        }
    }

    /// Start the periodic progress log, if configured
    pub async fn start(&self) {
        let Some(period) = self.inner.config.monitor_interval else {
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(monitor_loop(weak, period));
        if let Some(previous) = self.inner.monitor_handle.lock().await.replace(handle) {
            previous.abort();
        }
        info!(
            "Worker pool started: max_concurrency={}, task_timeout={:?}",
            self.inner.config.max_concurrency, self.inner.config.task_timeout
        );
    }

    /// Queue a task. It runs once a concurrency slot frees up.
    ///
    /// Safe to call from inside a running task. Must be called within a tokio
    /// runtime.
    pub fn submit<F, Fut>(&self, label: impl Into<String>, task: F) -> Result<(), PoolError>
    where
        F: FnOnce(P::Context) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }
        let label = label.into();

        self.inner.outstanding.send_modify(|n| *n += 1);
        self.inner.stats.record_submitted();
        let guard = OutstandingGuard(Arc::clone(&self.inner));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _guard = guard;
            inner.execute(label, task).await;
        });
        Ok(())
    }

    /// Wait for quiescence: nothing queued, nothing running, and no new
    /// submission during one full settle interval
    ///
    /// The settle window covers work that is discovered by a finished task but
    /// submitted slightly later by an observer of its side effects.
    pub async fn await_idle(&self) {
        let mut outstanding = self.inner.outstanding.subscribe();
        loop {
            // The sender lives in `inner`, so this cannot observe a closed channel
            let _ = outstanding.wait_for(|n| *n == 0).await;
            let submitted = self.inner.stats.submitted();

            tokio::time::sleep(self.inner.config.settle_interval).await;

            if *outstanding.borrow() == 0 && self.inner.stats.submitted() == submitted {
                debug!("Worker pool is idle");
                return;
            }
            debug!("Worker pool received new work while settling");
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self.inner.outstanding.borrow() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting work, cancel queued and running tasks, wait for every
    /// context to be released, then shut the provider down
    ///
    /// Idempotent. After a successful `await_idle` there is nothing to cancel.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down worker pool");

        self.inner.slots.close();
        self.inner.cancel.send_replace(true);

        let mut outstanding = self.inner.outstanding.subscribe();
        let _ = outstanding.wait_for(|n| *n == 0).await;

        if let Some(handle) = self.inner.monitor_handle.lock().await.take() {
            handle.abort();
        }
        self.inner.provider.shutdown().await;

        let stats = self.inner.stats.snapshot();
        info!(
            "Worker pool shutdown complete: {} succeeded, {} failed ({} timed out), {} cancelled",
            stats.succeeded, stats.failed, stats.timed_out, stats.cancelled
        );
    }

    #[must_use]
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl<P: ContextProvider> PoolInner<P> {
    async fn execute<F, Fut>(&self, label: String, task: F)
    where
        F: FnOnce(P::Context) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.slots).acquire_owned().await else {
            debug!("Task dropped before start, pool closed: {label}");
            self.stats.record_cancelled();
            return;
        };
        let mut cancel = self.cancel.subscribe();

        let context = match self.provider.acquire().await {
            Ok(context) => context,
            Err(e) => {
                self.finish(&label, Outcome::Failed(TaskFailure::ContextUnavailable(e)), None);
                return;
            }
        };
        if *cancel.borrow() {
            self.provider.release(context).await;
            self.finish(&label, Outcome::Cancelled, None);
            return;
        }

        self.stats.record_started();
        self.monitor.task_started(&label);
        let started = Instant::now();
        let budget = self.config.task_timeout;

        let task_context = context.clone();
        let body = AssertUnwindSafe(async move { task(task_context).await }).catch_unwind();

        let outcome = tokio::select! {
            result = tokio::time::timeout(budget, body) => match result {
                Ok(Ok(Ok(()))) => Outcome::Succeeded,
                Ok(Ok(Err(e))) => Outcome::Failed(TaskFailure::Failed(e)),
                Ok(Err(panic)) => Outcome::Failed(TaskFailure::Panicked(panic_message(panic.as_ref()))),
                Err(_) => Outcome::Failed(TaskFailure::TimedOut(budget)),
            },
            _ = cancel.wait_for(|cancelled| *cancelled) => Outcome::Cancelled,
        };

        // Context teardown happens before the slot is handed to the next task
        self.provider.release(context).await;
        self.stats.record_stopped();
        drop(permit);

        self.finish(&label, outcome, Some(started.elapsed()));
    }

    fn finish(&self, label: &str, outcome: Outcome, elapsed: Option<Duration>) {
        match outcome {
            Outcome::Succeeded => {
                self.stats.record_succeeded();
                self.monitor
                    .task_succeeded(label, elapsed.unwrap_or_default());
            }
            Outcome::Failed(failure) => {
                if matches!(failure, TaskFailure::TimedOut(_)) {
                    self.stats.record_timed_out();
                }
                self.stats.record_failed();
                self.monitor.task_failed(label, &failure);
            }
            Outcome::Cancelled => {
                self.stats.record_cancelled();
                debug!("Task cancelled by shutdown: {label}");
            }
        }
    }
}

async fn monitor_loop<P: ContextProvider>(pool: Weak<PoolInner<P>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let Some(inner) = pool.upgrade() else { break };
        if inner.closed.load(Ordering::SeqCst) {
            break;
        }
        let stats = inner.stats.snapshot();
        info!(
            "Pool progress: {} running, {} queued, {} succeeded, {} failed ({} timed out)",
            stats.running,
            stats.pending().saturating_sub(stats.running as u64),
            stats.succeeded,
            stats.failed,
            stats.timed_out
        );
    }

    debug!("Pool monitor loop exiting");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
