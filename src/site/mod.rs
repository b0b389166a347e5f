//! Site scraping capability
//!
//! A [`SiteScraper`] knows how to fetch and extract one marketplace's listing,
//! shop and product pages inside an execution context handed out by the
//! worker pool. The crawl flows only see the discovered identities and the
//! extracted records.

pub mod bukalapak;
mod js_scripts;
mod types;

pub use bukalapak::BukalapakScraper;
pub use types::{ListingPage, ProductRecord, ScrapeError, ShopPage};

use std::future::Future;

/// Fetch+extract capability for one target site
///
/// `Session` is the per-task execution context (one isolated browser session
/// for the real scraper). Methods taking a URL navigate; the product methods
/// are split so that the content wait is its own step.
pub trait SiteScraper: Send + Sync + 'static {
    type Session: Send + Sync;

    /// Fetch listing page `page` and collect the product and shop links on it.
    /// Fails with `ScrapeError::ContentTimeout` when no result card renders.
    fn scrape_listing(
        &self,
        session: &Self::Session,
        page: u32,
    ) -> impl Future<Output = Result<ListingPage, ScrapeError>> + Send;

    /// Fetch page `page` of a shop's product list
    fn scrape_shop(
        &self,
        session: &Self::Session,
        shop_url: &str,
        page: u32,
    ) -> impl Future<Output = Result<ShopPage, ScrapeError>> + Send;

    /// Navigate to a product page with resource filtering applied and scroll
    /// it to the bottom
    fn open_product(
        &self,
        session: &Self::Session,
        url: &str,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Wait, bounded, for the product page's primary content marker
    fn await_product(
        &self,
        session: &Self::Session,
        url: &str,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    fn extract_product(
        &self,
        session: &Self::Session,
        url: &str,
    ) -> impl Future<Output = Result<ProductRecord, ScrapeError>> + Send;
}
