//! Pool task construction for each kind of work item

use std::sync::Arc;
use tracing::warn;

use super::crawl_types::{ItemKind, WorkItem};
use super::directory::DirectoryFlow;
use super::dispatcher::Dispatch;
use super::product::ProductFlow;
use super::shop::ShopFlow;
use crate::queue_store::QueueStore;
use crate::site::SiteScraper;
use crate::worker_pool::{ContextProvider, PoolError, WorkerPool};

/// Submits crawl flows to the pool. Cheap to clone; running tasks never hold
/// one, so the pool is free to shut down once the dispatcher stops.
pub struct CrawlTasks<P, S>
where
    P: ContextProvider,
    S: SiteScraper<Session = P::Context>,
{
    pool: WorkerPool<P>,
    store: QueueStore,
    scraper: Arc<S>,
}

impl<P, S> Clone for CrawlTasks<P, S>
where
    P: ContextProvider,
    S: SiteScraper<Session = P::Context>,
{
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            store: self.store.clone(),
            scraper: Arc::clone(&self.scraper),
        }
    }
}

impl<P, S> CrawlTasks<P, S>
where
    P: ContextProvider,
    S: SiteScraper<Session = P::Context>,
{
    pub fn new(pool: WorkerPool<P>, store: QueueStore, scraper: Arc<S>) -> Self {
        Self {
            pool,
            store,
            scraper,
        }
    }

    fn submit_listing(&self, page: u32) -> Result<(), PoolError> {
        let store = self.store.clone();
        let scraper = Arc::clone(&self.scraper);
        self.pool
            .submit(WorkItem::listing_page(page).label(), move |session| async move {
                DirectoryFlow::new(&store, scraper.as_ref(), &session, page)
                    .run()
                    .await?;
                Ok(())
            })
    }

    fn submit_shop(&self, url: String) -> Result<(), PoolError> {
        let store = self.store.clone();
        let scraper = Arc::clone(&self.scraper);
        self.pool
            .submit(WorkItem::shop(url.as_str()).label(), move |session| async move {
                ShopFlow::new(&store, scraper.as_ref(), &session, &url)
                    .run()
                    .await?;
                Ok(())
            })
    }

    fn submit_product(&self, url: String) -> Result<(), PoolError> {
        let store = self.store.clone();
        let scraper = Arc::clone(&self.scraper);
        self.pool
            .submit(WorkItem::product(url.as_str()).label(), move |session| async move {
                ProductFlow::new(&store, scraper.as_ref(), &session, &url)
                    .run()
                    .await?;
                Ok(())
            })
    }
}

impl<P, S> Dispatch for CrawlTasks<P, S>
where
    P: ContextProvider,
    S: SiteScraper<Session = P::Context>,
{
    fn dispatch(&self, item: WorkItem) -> Result<(), PoolError> {
        match item.kind {
            ItemKind::Product => self.submit_product(item.identity),
            ItemKind::Shop => self.submit_shop(item.identity),
            ItemKind::ListingPage => match item.identity.parse() {
                Ok(page) => self.submit_listing(page),
                Err(_) => {
                    warn!("Ignoring listing item with non-numeric page {:?}", item.identity);
                    Ok(())
                }
            },
        }
    }
}
