mod common;

use common::{CountingProvider, eventually, test_pool_config};
use shopcrawl::WorkerPool;
use shopcrawl::worker_pool::{LoggingMonitor, PoolConfig, PoolError, TaskFailure, TaskMonitor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingMonitor {
    failures: Mutex<Vec<(String, String)>>,
    succeeded: AtomicUsize,
}

impl TaskMonitor for RecordingMonitor {
    fn task_started(&self, _label: &str) {}

    fn task_succeeded(&self, _label: &str, _elapsed: Duration) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn task_failed(&self, label: &str, failure: &TaskFailure) {
        let kind = match failure {
            TaskFailure::Failed(_) => "failed",
            TaskFailure::TimedOut(_) => "timed_out",
            TaskFailure::Panicked(_) => "panicked",
            TaskFailure::ContextUnavailable(_) => "no_context",
        };
        self.failures
            .lock()
            .unwrap()
            .push((label.to_string(), kind.to_string()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_flood_never_exceeds_concurrency_bound() {
    let max = 4;
    let provider = CountingProvider::default();
    let pool = WorkerPool::new(test_pool_config(max), provider.clone());
    pool.start().await;

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    for i in 0..max * 10 {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        pool.submit(format!("task {i}"), move |_ctx| async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    pool.await_idle().await;

    assert!(peak.load(Ordering::SeqCst) <= max);
    assert!(provider.peak_active() <= max);
    assert!(pool.stats().peak_running <= max);

    let stats = pool.stats();
    assert_eq!(stats.submitted, (max * 10) as u64);
    assert_eq!(stats.succeeded, (max * 10) as u64);
    assert_eq!(stats.pending(), 0);
    assert_eq!(provider.acquired(), max * 10);
    assert_eq!(provider.released(), provider.acquired());
    assert_eq!(provider.active(), 0);

    pool.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timeout_is_reported_and_pool_continues() {
    let monitor = Arc::new(RecordingMonitor::default());
    let provider = CountingProvider::default();
    let config = PoolConfig {
        task_timeout: Duration::from_millis(100),
        ..test_pool_config(2)
    };
    let pool = WorkerPool::with_monitor(config, provider.clone(), monitor.clone());

    pool.submit("slow", |_ctx| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    })
    .unwrap();
    pool.submit("fast", |_ctx| async { Ok(()) }).unwrap();

    pool.await_idle().await;

    let stats = pool.stats();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.timed_out, 1);
    assert_eq!(
        monitor.failures.lock().unwrap().clone(),
        vec![("slow".to_string(), "timed_out".to_string())]
    );
    assert_eq!(provider.released(), 2);

    pool.submit("after", |_ctx| async { Ok(()) }).unwrap();
    pool.await_idle().await;
    assert_eq!(pool.stats().succeeded, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_submitted_from_tasks_are_awaited() {
    let pool = WorkerPool::new(test_pool_config(2), CountingProvider::default());
    let finished = Arc::new(AtomicUsize::new(0));

    let inner_pool = pool.clone();
    let counter = Arc::clone(&finished);
    pool.submit("parent", move |_ctx| async move {
        for i in 0..3 {
            let grandchild_pool = inner_pool.clone();
            let counter = Arc::clone(&counter);
            inner_pool.submit(format!("child {i}"), move |_ctx| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let counter_inner = Arc::clone(&counter);
                grandchild_pool.submit("grandchild", move |_ctx| async move {
                    counter_inner.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })?;
        }
        Ok(())
    })
    .unwrap();

    pool.await_idle().await;

    assert_eq!(finished.load(Ordering::SeqCst), 6);
    assert_eq!(pool.stats().succeeded, 7);
    assert!(pool.is_idle());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_late_submission_within_settle_window_is_awaited() {
    let pool = WorkerPool::new(
        PoolConfig {
            settle_interval: Duration::from_millis(300),
            ..test_pool_config(2)
        },
        CountingProvider::default(),
    );
    pool.submit("first", |_ctx| async { Ok(()) }).unwrap();

    let late_pool = pool.clone();
    let late = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        late_pool
            .submit("late", |_ctx| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .unwrap();
    });

    pool.await_idle().await;
    late.await.unwrap();
    assert_eq!(pool.stats().succeeded, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panics_and_errors_are_isolated() {
    let monitor = Arc::new(RecordingMonitor::default());
    let provider = CountingProvider::default();
    let pool = WorkerPool::with_monitor(test_pool_config(2), provider.clone(), monitor.clone());

    let explode = true;
    pool.submit("panics", move |_ctx| async move {
        if explode {
            panic!("boom");
        }
        Ok(())
    })
    .unwrap();
    pool.submit("errors", |_ctx| async { Err(anyhow::anyhow!("bad page")) })
        .unwrap();
    pool.submit("works", |_ctx| async { Ok(()) }).unwrap();

    pool.await_idle().await;

    let stats = pool.stats();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 2);
    assert_eq!(monitor.succeeded.load(Ordering::SeqCst), 1);

    let mut failures = monitor.failures.lock().unwrap().clone();
    failures.sort();
    assert_eq!(
        failures,
        vec![
            ("errors".to_string(), "failed".to_string()),
            ("panics".to_string(), "panicked".to_string()),
        ]
    );
    assert_eq!(provider.acquired(), 3);
    assert_eq!(provider.released(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_task_gets_its_own_context() {
    let provider = CountingProvider::default();
    let pool = WorkerPool::new(test_pool_config(4), provider.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..8 {
        let seen = Arc::clone(&seen);
        pool.submit(format!("task {i}"), move |ctx| async move {
            seen.lock().unwrap().push(ctx.id);
            Ok(())
        })
        .unwrap();
    }
    pool.await_idle().await;

    let mut ids = seen.lock().unwrap().clone();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_context_failure_is_reported_without_running_task() {
    let monitor = Arc::new(RecordingMonitor::default());
    let provider = CountingProvider::default();
    provider.fail_acquire(true);
    let pool = WorkerPool::with_monitor(test_pool_config(2), provider.clone(), monitor.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    pool.submit("no browser", move |_ctx| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();
    pool.await_idle().await;

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(pool.stats().failed, 1);
    assert_eq!(
        monitor.failures.lock().unwrap().clone(),
        vec![("no browser".to_string(), "no_context".to_string())]
    );
    assert_eq!(provider.released(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_cancels_running_and_queued_tasks() {
    let provider = CountingProvider::default();
    let pool = WorkerPool::with_monitor(
        test_pool_config(2),
        provider.clone(),
        Arc::new(LoggingMonitor),
    );

    for i in 0..5 {
        pool.submit(format!("long {i}"), |_ctx| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .unwrap();
    }
    assert!(eventually(Duration::from_secs(5), || provider.active() == 2).await);

    pool.shutdown().await;

    let stats = pool.stats();
    assert_eq!(stats.cancelled, 5);
    assert_eq!(stats.succeeded, 0);
    assert_eq!(stats.running, 0);
    assert_eq!(provider.acquired(), provider.released());
    assert!(provider.is_shut_down());
    assert!(pool.is_closed());

    let err = pool.submit("too late", |_ctx| async { Ok(()) }).unwrap_err();
    assert!(matches!(err, PoolError::Closed));

    // Second shutdown is a no-op
    pool.shutdown().await;
}

#[tokio::test]
async fn test_await_idle_on_empty_pool_returns() {
    let pool = WorkerPool::new(test_pool_config(1), CountingProvider::default());
    tokio::time::timeout(Duration::from_secs(5), pool.await_idle())
        .await
        .expect("empty pool should settle");
    assert_eq!(pool.stats().submitted, 0);
}
