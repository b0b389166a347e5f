//! Directory discovery: one listing page into queue entries
//!
//! ```text
//! NotStarted -> Skipped                        (completion marker present)
//! NotStarted -> Fetching -> Parsing -> Done    (entries + marker written)
//!               Fetching -> Done               (no results rendered; no marker)
//! ```

use tracing::{debug, info};

use super::crawl_types::{CrawlError, CrawlResult, WorkItem};
use crate::queue_store::{Namespace, QueueStore};
use crate::site::{ListingPage, ScrapeError, SiteScraper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryState {
    NotStarted,
    Fetching,
    Parsing(ListingPage),
    /// `marked` is false when the page never rendered and must be retried by a
    /// later run
    Done { marked: bool },
    Skipped,
}

impl DirectoryState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Skipped)
    }
}

pub struct DirectoryFlow<'a, S: SiteScraper> {
    store: &'a QueueStore,
    scraper: &'a S,
    session: &'a S::Session,
    page: u32,
}

impl<'a, S: SiteScraper> DirectoryFlow<'a, S> {
    pub fn new(store: &'a QueueStore, scraper: &'a S, session: &'a S::Session, page: u32) -> Self {
        Self {
            store,
            scraper,
            session,
            page,
        }
    }

    fn marker_key(&self) -> String {
        WorkItem::listing_page(self.page).key()
    }

    /// Perform the side effects of `state` and return the next state
    pub async fn step(&self, state: DirectoryState) -> CrawlResult<DirectoryState> {
        match state {
            DirectoryState::NotStarted => {
                let marked = self
                    .store
                    .has(Namespace::ProcessedMainPage, &self.marker_key())
                    .await?;
                Ok(if marked {
                    DirectoryState::Skipped
                } else {
                    DirectoryState::Fetching
                })
            }
            DirectoryState::Fetching => {
                match self.scraper.scrape_listing(self.session, self.page).await {
                    Ok(listing) => Ok(DirectoryState::Parsing(listing)),
                    Err(ScrapeError::ContentTimeout { waited, .. }) => {
                        info!(
                            "Listing page {} rendered no results within {:?}, leaving it for a later run",
                            self.page, waited
                        );
                        Ok(DirectoryState::Done { marked: false })
                    }
                    Err(e) => Err(CrawlError::from(e)),
                }
            }
            DirectoryState::Parsing(listing) => {
                let products = listing
                    .products
                    .into_iter()
                    .map(|url| (WorkItem::product(url.as_str()).key(), url));
                let products = self
                    .store
                    .put_many(Namespace::QueueProduct, products)
                    .await?;

                let shops = listing
                    .shops
                    .into_iter()
                    .map(|url| (WorkItem::shop(url.as_str()).key(), url));
                let shops = self.store.put_many(Namespace::QueueShop, shops).await?;

                // The marker goes last: its presence means every entry above is durable
                self.store
                    .put(Namespace::ProcessedMainPage, &self.marker_key(), &self.page, None)
                    .await?;
                info!(
                    "Listing page {} queued {} products and {} shops",
                    self.page, products, shops
                );
                Ok(DirectoryState::Done { marked: true })
            }
            terminal @ (DirectoryState::Done { .. } | DirectoryState::Skipped) => Ok(terminal),
        }
    }

    /// Drive the flow from `NotStarted` to a terminal state
    pub async fn run(&self) -> CrawlResult<DirectoryState> {
        let mut state = DirectoryState::NotStarted;
        while !state.is_terminal() {
            state = self.step(state).await?;
        }
        if state == DirectoryState::Skipped {
            debug!("Listing page {} already processed", self.page);
        }
        Ok(state)
    }
}
