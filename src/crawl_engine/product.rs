//! Product extraction: one product page into a processed record
//!
//! ```text
//! Fetching -> WaitForContent -> Extract -> Persist -> Done
//!             WaitForContent -> Failed                (entry dropped)
//! ```
//!
//! `Persist` writes the record before deleting the queue entry, so a crash
//! between the two leaves the entry in place for a later run.

use tracing::{info, warn};

use super::crawl_types::{CrawlError, CrawlResult, WorkItem};
use crate::queue_store::{Namespace, QueueStore};
use crate::site::{ProductRecord, ScrapeError, SiteScraper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductState {
    Fetching,
    WaitForContent,
    Extract,
    Persist(ProductRecord),
    Done,
    /// The content never appeared; the queue entry was deleted
    Failed { waited: std::time::Duration },
}

impl ProductState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

pub struct ProductFlow<'a, S: SiteScraper> {
    store: &'a QueueStore,
    scraper: &'a S,
    session: &'a S::Session,
    url: &'a str,
    key: String,
}

impl<'a, S: SiteScraper> ProductFlow<'a, S> {
    pub fn new(store: &'a QueueStore, scraper: &'a S, session: &'a S::Session, url: &'a str) -> Self {
        Self {
            store,
            scraper,
            session,
            url,
            key: WorkItem::product(url).key(),
        }
    }

    pub async fn step(&self, state: ProductState) -> CrawlResult<ProductState> {
        match state {
            ProductState::Fetching => {
                self.scraper.open_product(self.session, self.url).await?;
                Ok(ProductState::WaitForContent)
            }
            ProductState::WaitForContent => {
                match self.scraper.await_product(self.session, self.url).await {
                    Ok(()) => Ok(ProductState::Extract),
                    Err(ScrapeError::ContentTimeout { waited, .. }) => {
                        warn!(
                            "Dropping product {}: content missing after {:?}",
                            self.url, waited
                        );
                        self.store
                            .delete(Namespace::QueueProduct, &self.key, true)
                            .await?;
                        Ok(ProductState::Failed { waited })
                    }
                    Err(e) => Err(CrawlError::from(e)),
                }
            }
            ProductState::Extract => {
                let record = self.scraper.extract_product(self.session, self.url).await?;
                Ok(ProductState::Persist(record))
            }
            ProductState::Persist(record) => {
                self.store
                    .put(Namespace::ProcessedProduct, &self.key, &record, None)
                    .await?;
                self.store
                    .delete(Namespace::QueueProduct, &self.key, true)
                    .await?;
                info!(
                    "Processed product {} ({})",
                    self.url,
                    record.title.as_deref().unwrap_or("untitled")
                );
                Ok(ProductState::Done)
            }
            terminal @ (ProductState::Done | ProductState::Failed { .. }) => Ok(terminal),
        }
    }

    /// Drive the flow to completion
    ///
    /// A dropped product is reported as `CrawlError::ContentTimeout` so the
    /// pool monitor records it as failed.
    pub async fn run(&self) -> CrawlResult<()> {
        let mut state = ProductState::Fetching;
        while !state.is_terminal() {
            state = self.step(state).await?;
        }
        match state {
            ProductState::Failed { waited } => Err(CrawlError::ContentTimeout {
                url: self.url.to_string(),
                waited,
            }),
            _ => Ok(()),
        }
    }
}
