//! Core types shared by the crawl flows: work items, errors and run summaries.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::queue_store::{Namespace, StoreError};
use crate::site::ScrapeError;
use crate::utils::content_hash;
use crate::worker_pool::{PoolError, PoolStatsSnapshot};

/// Error type for crawl operations
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The page's primary content never appeared within the bounded wait
    #[error("Content did not appear within {waited:?} at {url}")]
    ContentTimeout { url: String, waited: Duration },

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Browser or extraction failure other than a content timeout
    #[error("Scrape failed: {0:#}")]
    Scrape(anyhow::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A fatal task error stopped the run before the pool went idle
    #[error("Crawl run aborted: {reason}")]
    RunAborted { reason: String },
}

impl CrawlError {
    /// Fatal errors abort the whole run instead of just their task.
    /// Only an unavailable storage medium qualifies.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_unavailable())
    }

    /// Whether a task failure carries a fatal `CrawlError`
    #[must_use]
    pub fn is_fatal_task_error(err: &anyhow::Error) -> bool {
        err.downcast_ref::<Self>().is_some_and(Self::is_fatal)
    }
}

impl From<ScrapeError> for CrawlError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::ContentTimeout { url, waited, .. } => Self::ContentTimeout { url, waited },
            ScrapeError::Browser(e) => Self::Scrape(e),
        }
    }
}

/// Convenience alias for Result with `CrawlError`
pub type CrawlResult<T> = Result<T, CrawlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemKind {
    ListingPage,
    Shop,
    Product,
}

impl ItemKind {
    /// Queue namespace items of this kind wait in; listing pages have none
    #[must_use]
    pub fn queue_namespace(self) -> Option<Namespace> {
        match self {
            Self::ListingPage => None,
            Self::Shop => Some(Namespace::QueueShop),
            Self::Product => Some(Namespace::QueueProduct),
        }
    }

    #[must_use]
    pub fn from_queue_namespace(namespace: Namespace) -> Option<Self> {
        match namespace {
            Namespace::QueueShop => Some(Self::Shop),
            Namespace::QueueProduct => Some(Self::Product),
            Namespace::ProcessedProduct | Namespace::ProcessedMainPage => None,
        }
    }
}

/// A discovered unit of work
///
/// For shops and products the identity is the source URL. For listing pages
/// it is the page index, which is also the completion marker key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub kind: ItemKind,
    pub identity: String,
}

impl WorkItem {
    pub fn product(url: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Product,
            identity: url.into(),
        }
    }

    pub fn shop(url: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Shop,
            identity: url.into(),
        }
    }

    #[must_use]
    pub fn listing_page(page: u32) -> Self {
        Self {
            kind: ItemKind::ListingPage,
            identity: page.to_string(),
        }
    }

    /// Store key: the content hash of the identity, or the page index for
    /// listing pages
    #[must_use]
    pub fn key(&self) -> String {
        match self.kind {
            ItemKind::ListingPage => self.identity.clone(),
            ItemKind::Shop | ItemKind::Product => content_hash(&self.identity),
        }
    }

    /// Namespace holding this item's entry (queue entry or completion marker)
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.kind
            .queue_namespace()
            .unwrap_or(Namespace::ProcessedMainPage)
    }

    /// Label used in pool monitoring
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::ListingPage => write!(f, "listing page {}", self.identity),
            ItemKind::Shop => write!(f, "shop {}", self.identity),
            ItemKind::Product => write!(f, "product {}", self.identity),
        }
    }
}

/// Outcome of a finished crawl run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Listing pages submitted this run
    pub listing_seeded: usize,
    /// Listing pages skipped because their completion marker existed
    pub listing_skipped: usize,
    /// Product entries left over from a previous run
    pub products_backlog: usize,
    /// Shop entries left over from a previous run
    pub shops_backlog: usize,
    pub stats: PoolStatsSnapshot,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_identity() {
        let a = WorkItem::product("https://example.com/p/1");
        let b = WorkItem::product("https://example.com/p/1");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().len(), crate::utils::CONTENT_HASH_LEN);
        assert_eq!(a.namespace(), Namespace::QueueProduct);

        let page = WorkItem::listing_page(7);
        assert_eq!(page.key(), "7");
        assert_eq!(page.namespace(), Namespace::ProcessedMainPage);
    }

    #[test]
    fn only_unavailable_storage_is_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let fatal = CrawlError::Storage(StoreError::Unavailable {
            path: "/data".into(),
            source: io,
        });
        assert!(fatal.is_fatal());
        assert!(CrawlError::is_fatal_task_error(&anyhow::Error::from(fatal)));

        let timeout = CrawlError::ContentTimeout {
            url: "https://example.com".into(),
            waited: Duration::from_secs(1),
        };
        assert!(!timeout.is_fatal());
        assert!(!CrawlError::is_fatal_task_error(&anyhow::anyhow!("boom")));
        assert!(!CrawlError::Storage(StoreError::InvalidKey("x/y".into())).is_fatal());
    }
}
