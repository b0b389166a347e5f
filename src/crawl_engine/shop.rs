//! Shop pagination: walk a shop's product pages with a persisted cursor
//!
//! ```text
//! Init -> FetchPage -> ExtractLinks -> AdvanceOrStop -> FetchPage ...
//!                                                    -> Done (entry deleted)
//! Init -> Done                                       (cursor already terminal)
//! ```
//!
//! The cursor (`lastPage`) is the next page to fetch. It is written after
//! every page together with the page count seen (`maxPage`), so a crashed run
//! resumes at the first unfetched page and a run that crashed right before
//! deleting the entry finishes without fetching again.

use serde_json::Value;
use tracing::{debug, info};

use super::crawl_types::{CrawlResult, WorkItem};
use crate::queue_store::{Metadata, Namespace, QueueStore};
use crate::site::{ShopPage, SiteScraper};

pub const LAST_PAGE_FIELD: &str = "lastPage";
pub const MAX_PAGE_FIELD: &str = "maxPage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopState {
    Init,
    FetchPage { cursor: u32 },
    ExtractLinks { cursor: u32, page: ShopPage },
    AdvanceOrStop { cursor: u32, max_page: u32 },
    Done,
}

/// Pagination cursor as stored in a shop entry's metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShopCursor {
    pub last_page: Option<u32>,
    pub max_page: Option<u32>,
}

impl ShopCursor {
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let field = |name: &str| {
            metadata
                .get(name)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
        };
        Self {
            last_page: field(LAST_PAGE_FIELD),
            max_page: field(MAX_PAGE_FIELD),
        }
    }

    #[must_use]
    pub fn to_metadata(self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(last) = self.last_page {
            metadata.insert(LAST_PAGE_FIELD.to_string(), Value::from(last));
        }
        if let Some(max) = self.max_page {
            metadata.insert(MAX_PAGE_FIELD.to_string(), Value::from(max));
        }
        metadata
    }

    /// The cursor already reached the last page seen by a previous run
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!((self.last_page, self.max_page), (Some(last), Some(max)) if last >= max)
    }

    /// Page to fetch next; page 1 when nothing was fetched yet
    #[must_use]
    pub fn resume_page(&self) -> u32 {
        self.last_page.unwrap_or(1).max(1)
    }
}

pub struct ShopFlow<'a, S: SiteScraper> {
    store: &'a QueueStore,
    scraper: &'a S,
    session: &'a S::Session,
    url: &'a str,
    key: String,
}

impl<'a, S: SiteScraper> ShopFlow<'a, S> {
    pub fn new(store: &'a QueueStore, scraper: &'a S, session: &'a S::Session, url: &'a str) -> Self {
        Self {
            store,
            scraper,
            session,
            url,
            key: WorkItem::shop(url).key(),
        }
    }

    pub async fn step(&self, state: ShopState) -> CrawlResult<ShopState> {
        match state {
            ShopState::Init => {
                let metadata = self.store.get_metadata(Namespace::QueueShop, &self.key).await?;
                let cursor = ShopCursor::from_metadata(&metadata);
                if cursor.is_exhausted() {
                    debug!("Shop {} already paginated, dropping entry", self.url);
                    self.finish().await?;
                    return Ok(ShopState::Done);
                }
                let resume = cursor.resume_page();
                if resume > 1 {
                    info!("Resuming shop {} at page {}", self.url, resume);
                }
                Ok(ShopState::FetchPage { cursor: resume })
            }
            ShopState::FetchPage { cursor } => {
                let page = self.scraper.scrape_shop(self.session, self.url, cursor).await?;
                Ok(ShopState::ExtractLinks { cursor, page })
            }
            ShopState::ExtractLinks { cursor, page } => {
                let max_page = page.max_page.max(1);
                let products = page
                    .products
                    .into_iter()
                    .map(|url| (WorkItem::product(url.as_str()).key(), url));
                let queued = self
                    .store
                    .put_many(Namespace::QueueProduct, products)
                    .await?;
                debug!(
                    "Shop {} page {}/{} queued {} products",
                    self.url, cursor, max_page, queued
                );
                Ok(ShopState::AdvanceOrStop { cursor, max_page })
            }
            ShopState::AdvanceOrStop { cursor, max_page } => {
                let next = cursor.saturating_add(1);
                let persisted = ShopCursor {
                    last_page: Some(next),
                    max_page: Some(max_page),
                };
                self.store
                    .set_metadata(Namespace::QueueShop, &self.key, &persisted.to_metadata())
                    .await?;

                if next < max_page {
                    Ok(ShopState::FetchPage { cursor: next })
                } else {
                    self.finish().await?;
                    info!("Shop {} finished after page {}", self.url, cursor);
                    Ok(ShopState::Done)
                }
            }
            ShopState::Done => Ok(ShopState::Done),
        }
    }

    async fn finish(&self) -> CrawlResult<()> {
        self.store
            .delete(Namespace::QueueShop, &self.key, true)
            .await?;
        Ok(())
    }

    pub async fn run(&self) -> CrawlResult<ShopState> {
        let mut state = ShopState::Init;
        while state != ShopState::Done {
            state = self.step(state).await?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_defaults_to_first_page() {
        let cursor = ShopCursor::from_metadata(&Metadata::new());
        assert_eq!(cursor, ShopCursor::default());
        assert_eq!(cursor.resume_page(), 1);
        assert!(!cursor.is_exhausted());
    }

    #[test]
    fn cursor_round_trips_through_metadata() {
        let cursor = ShopCursor {
            last_page: Some(3),
            max_page: Some(3),
        };
        let parsed = ShopCursor::from_metadata(&cursor.to_metadata());
        assert_eq!(parsed, cursor);
        assert!(parsed.is_exhausted());
    }

    #[test]
    fn cursor_without_page_count_is_never_exhausted() {
        let mut metadata = Metadata::new();
        metadata.insert(LAST_PAGE_FIELD.into(), Value::from(5));
        let cursor = ShopCursor::from_metadata(&metadata);
        assert_eq!(cursor.resume_page(), 5);
        assert!(!cursor.is_exhausted());
    }

    #[test]
    fn ignores_non_numeric_cursor() {
        let mut metadata = Metadata::new();
        metadata.insert(LAST_PAGE_FIELD.into(), Value::from("two"));
        assert_eq!(ShopCursor::from_metadata(&metadata).resume_page(), 1);
    }
}
