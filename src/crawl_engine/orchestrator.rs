//! Crawl run orchestration
//!
//! A run seeds the listing pages that have no completion marker, replays the
//! queue backlog left by earlier runs, then lets the live dispatcher schedule
//! whatever the running tasks discover. It ends when the pool is quiescent,
//! or early when a task, seeding or the dispatcher hits a fatal storage
//! error.

use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{error, info};

use super::crawl_types::{CrawlError, CrawlResult, RunSummary, WorkItem};
use super::dispatcher::{Dispatch, LiveDispatcher, dispatch_backlog};
use super::tasks::CrawlTasks;
use crate::browser::ChromiumProvider;
use crate::config::CrawlConfig;
use crate::queue_store::{Namespace, QueueStore};
use crate::site::{BukalapakScraper, SiteScraper};
use crate::worker_pool::{ContextProvider, LoggingMonitor, TaskFailure, TaskMonitor, WorkerPool};

/// Logs task outcomes and raises the abort signal on the first fatal failure
#[derive(Default)]
struct RunMonitor {
    log: LoggingMonitor,
    fatal: Notify,
    reason: OnceLock<String>,
}

impl TaskMonitor for RunMonitor {
    fn task_started(&self, label: &str) {
        self.log.task_started(label);
    }

    fn task_succeeded(&self, label: &str, elapsed: std::time::Duration) {
        self.log.task_succeeded(label, elapsed);
    }

    fn task_failed(&self, label: &str, failure: &TaskFailure) {
        self.log.task_failed(label, failure);
        let fatal = failure
            .source_error()
            .is_some_and(CrawlError::is_fatal_task_error);
        if fatal {
            self.abort(format!("{label}: {failure}"));
        }
    }
}

impl RunMonitor {
    /// Record the first abort reason and wake the run
    fn abort(&self, reason: String) {
        error!("Aborting run: {reason}");
        if self.reason.set(reason).is_ok() {
            self.fatal.notify_one();
        }
    }
}

#[derive(Debug, Default)]
struct Seeded {
    listing_seeded: usize,
    listing_skipped: usize,
    products_backlog: usize,
    shops_backlog: usize,
}

/// Run one crawl to quiescence over `store`
///
/// The change feed is subscribed before anything is submitted and only
/// consumed once seeding is done, so no entry written meanwhile is missed.
/// Backlog entries can still be scheduled twice in that window.
pub async fn run_crawl<P, S>(
    config: &CrawlConfig,
    store: QueueStore,
    provider: P,
    scraper: Arc<S>,
) -> CrawlResult<RunSummary>
where
    P: ContextProvider,
    S: SiteScraper<Session = P::Context>,
{
    let started = Instant::now();
    let events = store.subscribe();

    let monitor = Arc::new(RunMonitor::default());
    let pool = WorkerPool::with_monitor(config.pool_config(), provider, monitor.clone());
    pool.start().await;
    let tasks = CrawlTasks::new(pool.clone(), store.clone(), scraper);

    let seeded = match seed(config, &store, &tasks).await {
        Ok(seeded) => seeded,
        Err(e) => {
            error!("Seeding failed: {e}");
            pool.shutdown().await;
            if e.is_fatal() {
                return Err(CrawlError::RunAborted {
                    reason: format!("seeding: {e}"),
                });
            }
            return Err(e);
        }
    };
    info!(
        "Seeded {} listing pages ({} already done), backlog: {} products, {} shops",
        seeded.listing_seeded, seeded.listing_skipped, seeded.products_backlog, seeded.shops_backlog
    );

    let dispatcher = LiveDispatcher::spawn(store.clone(), events, tasks);

    tokio::select! {
        () = pool.await_idle() => {}
        () = monitor.fatal.notified() => {}
        reason = dispatcher.fatal() => monitor.abort(format!("live dispatch: {reason}")),
    }

    // Stop scheduling before the pool closes
    let dispatched = dispatcher.stop().await;
    if let Some(reason) = dispatched.fatal {
        monitor.abort(format!("live dispatch: {reason}"));
    }
    pool.shutdown().await;

    if let Some(reason) = monitor.reason.get() {
        return Err(CrawlError::RunAborted {
            reason: reason.clone(),
        });
    }

    let summary = RunSummary {
        listing_seeded: seeded.listing_seeded,
        listing_skipped: seeded.listing_skipped,
        products_backlog: seeded.products_backlog,
        shops_backlog: seeded.shops_backlog,
        stats: pool.stats(),
        elapsed: started.elapsed(),
    };
    info!(
        "Crawl finished in {:.1}s: {} tasks succeeded, {} failed ({} timed out)",
        summary.elapsed.as_secs_f64(),
        summary.stats.succeeded,
        summary.stats.failed,
        summary.stats.timed_out
    );
    Ok(summary)
}

async fn seed<P, S>(
    config: &CrawlConfig,
    store: &QueueStore,
    tasks: &CrawlTasks<P, S>,
) -> CrawlResult<Seeded>
where
    P: ContextProvider,
    S: SiteScraper<Session = P::Context>,
{
    let mut seeded = Seeded::default();

    for page in config.first_page()..=config.last_page() {
        let marker = WorkItem::listing_page(page).key();
        if store.has(Namespace::ProcessedMainPage, &marker).await? {
            seeded.listing_skipped += 1;
            continue;
        }
        tasks.dispatch(WorkItem::listing_page(page))?;
        seeded.listing_seeded += 1;
    }

    seeded.products_backlog = dispatch_backlog(store, tasks, Namespace::QueueProduct).await?;
    seeded.shops_backlog = dispatch_backlog(store, tasks, Namespace::QueueShop).await?;
    Ok(seeded)
}

/// Crawl the configured marketplace with a local Chromium
pub async fn crawl_marketplace(config: &CrawlConfig) -> anyhow::Result<RunSummary> {
    let store = QueueStore::open(config.data_dir(), config.event_capacity()).await?;
    let provider = ChromiumProvider::launch(config.browser_options()).await?;
    let scraper = Arc::new(BukalapakScraper::new(config.scraper_options()));
    Ok(run_crawl(config, store, provider, scraper).await?)
}
