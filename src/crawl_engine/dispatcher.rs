//! Live dispatch of queue entries discovered while the crawl runs
//!
//! The dispatcher consumes the store's change feed and turns every `Put` into
//! the queue namespaces into a pool task. Metadata updates and removals are
//! ignored. Scheduling is not deduplicated: an entry re-inserted while its
//! task is in flight gets a second task, which the idempotent flows absorb.
//! A fatal storage error stops the loop and is reported through
//! [`LiveDispatcher::fatal`].

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::crawl_types::{CrawlError, CrawlResult, ItemKind, WorkItem};
use crate::queue_store::{Namespace, QueueStore, StoreError, StoreEvent};
use crate::worker_pool::PoolError;

/// Turns a work item into a scheduled task
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, item: WorkItem) -> Result<(), PoolError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Tasks submitted from change events and rescans
    pub dispatched: u64,
    /// Events whose entry was already gone when read
    pub missing: u64,
    /// Full rescans after the feed lagged
    pub rescans: u64,
    /// Error that stopped the loop early
    pub fatal: Option<String>,
}

/// Handle to the running dispatch loop
pub struct LiveDispatcher {
    stop: watch::Sender<bool>,
    fatal: watch::Receiver<Option<String>>,
    handle: JoinHandle<DispatchStats>,
}

impl LiveDispatcher {
    /// Start consuming `events`
    ///
    /// Events already buffered in the receiver are processed first, so a
    /// receiver subscribed before seeding loses nothing that was written
    /// before this call.
    pub fn spawn<D: Dispatch>(
        store: QueueStore,
        events: broadcast::Receiver<StoreEvent>,
        dispatch: D,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let (fatal_tx, fatal) = watch::channel(None);
        let handle = tokio::spawn(dispatch_loop(store, events, dispatch, stop_rx, fatal_tx));
        Self {
            stop,
            fatal,
            handle,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Resolves with the error message once the loop has stopped on a fatal
    /// error. Never resolves otherwise.
    pub async fn fatal(&self) -> String {
        let mut fatal = self.fatal.clone();
        let reason = fatal
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|reason| reason.clone());
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }

    /// Stop the loop and return its counters. Buffered events are discarded.
    pub async fn stop(self) -> DispatchStats {
        self.stop.send_replace(true);
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Dispatcher task ended abnormally: {e}");
                DispatchStats::default()
            }
        }
    }
}

async fn dispatch_loop<D: Dispatch>(
    store: QueueStore,
    mut events: broadcast::Receiver<StoreEvent>,
    dispatch: D,
    mut stop: watch::Receiver<bool>,
    fatal: watch::Sender<Option<String>>,
) -> DispatchStats {
    let mut stats = DispatchStats::default();
    debug!("Live dispatcher started");

    loop {
        let received = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            received = events.recv() => received,
        };

        let outcome = match received {
            Ok(event) => handle_event(&store, &dispatch, &event, &mut stats).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Dispatcher fell {skipped} events behind, rescanning queues");
                stats.rescans += 1;
                rescan(&store, &dispatch, &mut stats).await
            }
            Err(RecvError::Closed) => break,
        };

        match outcome {
            Ok(()) => {}
            Err(CrawlError::Pool(PoolError::Closed)) => {
                debug!("Pool closed, dispatcher exiting");
                break;
            }
            Err(e) if e.is_fatal() => {
                error!("Live dispatch hit a fatal error, stopping: {e}");
                let reason = e.to_string();
                stats.fatal = Some(reason.clone());
                fatal.send_replace(Some(reason));
                break;
            }
            Err(e) => warn!("Dispatch failed: {e}"),
        }
    }

    info!(
        "Live dispatcher stopped: {} dispatched, {} already gone, {} rescans",
        stats.dispatched, stats.missing, stats.rescans
    );
    stats
}

async fn handle_event<D: Dispatch>(
    store: &QueueStore,
    dispatch: &D,
    event: &StoreEvent,
    stats: &mut DispatchStats,
) -> CrawlResult<()> {
    if !event.is_put() {
        return Ok(());
    }
    let Some(kind) = ItemKind::from_queue_namespace(event.namespace) else {
        return Ok(());
    };
    match store.get::<String>(event.namespace, &event.key).await? {
        Some(identity) => {
            dispatch.dispatch(WorkItem { kind, identity })?;
            stats.dispatched += 1;
        }
        None => {
            debug!("Entry {}/{} gone before dispatch", event.namespace, event.key);
            stats.missing += 1;
        }
    }
    Ok(())
}

async fn rescan<D: Dispatch>(
    store: &QueueStore,
    dispatch: &D,
    stats: &mut DispatchStats,
) -> CrawlResult<()> {
    for namespace in [Namespace::QueueProduct, Namespace::QueueShop] {
        stats.dispatched += dispatch_backlog(store, dispatch, namespace).await? as u64;
    }
    Ok(())
}

/// Dispatch every entry currently in a queue namespace
///
/// Entries that cannot be decoded are skipped with a warning. Returns the
/// number of tasks submitted.
pub async fn dispatch_backlog<D: Dispatch>(
    store: &QueueStore,
    dispatch: &D,
    namespace: Namespace,
) -> CrawlResult<usize> {
    let Some(kind) = ItemKind::from_queue_namespace(namespace) else {
        return Ok(0);
    };

    let mut submitted = 0;
    for key in store.list_keys(namespace).await? {
        let identity = match store.get::<String>(namespace, &key).await {
            Ok(Some(identity)) => identity,
            Ok(None) => continue,
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("Skipping undecodable entry: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        dispatch.dispatch(WorkItem { kind, identity })?;
        submitted += 1;
    }
    Ok(submitted)
}
