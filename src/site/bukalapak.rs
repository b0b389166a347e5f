//! Bukalapak marketplace scraper

use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::js_scripts::{LISTING_LINKS, PRODUCT_DETAILS, SHOP_PAGE, auto_scroll_script};
use super::types::{ListingPage, ProductRecord, ScrapeError, ShopPage};
use super::SiteScraper;
use crate::browser::{BrowserSession, ResourceType};
use crate::utils::{
    DEFAULT_CONTENT_WAIT, DEFAULT_LISTING_URL, DEFAULT_SCROLL_INTERVAL, DEFAULT_SCROLL_STEP_PX,
};

/// Rendered once listing results are in the DOM
pub const LISTING_READY_SELECTOR: &str = ".bl-product-card-new";
/// Rendered once a product page's main content is in the DOM
pub const PRODUCT_READY_SELECTOR: &str = "h1";

#[derive(Debug, Clone)]
pub struct ScraperOptions {
    pub listing_url: String,
    pub content_wait: Duration,
    pub block_product_images: bool,
    pub scroll_step_px: u32,
    pub scroll_interval: Duration,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            content_wait: DEFAULT_CONTENT_WAIT,
            block_product_images: false,
            scroll_step_px: DEFAULT_SCROLL_STEP_PX,
            scroll_interval: DEFAULT_SCROLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BukalapakScraper {
    options: ScraperOptions,
}

impl BukalapakScraper {
    #[must_use]
    pub fn new(options: ScraperOptions) -> Self {
        Self { options }
    }

    /// Listing URL for page `page`
    pub fn listing_page_url(&self, page: u32) -> Result<Url, ScrapeError> {
        with_page(&self.options.listing_url, page)
    }

    async fn load(
        &self,
        session: &BrowserSession,
        url: &str,
        blocked: &[ResourceType],
    ) -> Result<(), ScrapeError> {
        session.block_resources(blocked);
        session.navigate(url).await?;
        let script = auto_scroll_script(
            self.options.scroll_step_px,
            self.options.scroll_interval.as_millis() as u64,
        );
        session.evaluate_json::<serde_json::Value>(&script).await?;
        Ok(())
    }

    async fn wait_for(
        &self,
        session: &BrowserSession,
        url: &str,
        selector: &str,
    ) -> Result<(), ScrapeError> {
        let waited = self.options.content_wait;
        if session.wait_for_selector(selector, waited).await {
            Ok(())
        } else {
            Err(ScrapeError::ContentTimeout {
                url: url.to_string(),
                selector: selector.to_string(),
                waited,
            })
        }
    }
}

impl SiteScraper for BukalapakScraper {
    type Session = BrowserSession;

    async fn scrape_listing(
        &self,
        session: &BrowserSession,
        page: u32,
    ) -> Result<ListingPage, ScrapeError> {
        let url = self.listing_page_url(page)?;
        self.load(session, url.as_str(), &[ResourceType::Font, ResourceType::Image])
            .await?;
        self.wait_for(session, url.as_str(), LISTING_READY_SELECTOR)
            .await?;

        let raw: ListingPage = session.evaluate_json(LISTING_LINKS).await?;
        let listing = ListingPage {
            products: resolve_links(&url, raw.products),
            shops: resolve_links(&url, raw.shops),
        };
        debug!(
            "Listing page {page}: {} products, {} shops",
            listing.products.len(),
            listing.shops.len()
        );
        Ok(listing)
    }

    async fn scrape_shop(
        &self,
        session: &BrowserSession,
        shop_url: &str,
        page: u32,
    ) -> Result<ShopPage, ScrapeError> {
        let url = with_page(shop_url, page)?;
        self.load(session, url.as_str(), &[ResourceType::Font]).await?;

        let raw: ShopPage = session.evaluate_json(SHOP_PAGE).await?;
        Ok(ShopPage {
            products: resolve_links(&url, raw.products),
            max_page: raw.max_page.max(1),
        })
    }

    async fn open_product(&self, session: &BrowserSession, url: &str) -> Result<(), ScrapeError> {
        let blocked: &[ResourceType] = if self.options.block_product_images {
            &[ResourceType::Font, ResourceType::Image]
        } else {
            &[ResourceType::Font]
        };
        self.load(session, url, blocked).await
    }

    async fn await_product(&self, session: &BrowserSession, url: &str) -> Result<(), ScrapeError> {
        self.wait_for(session, url, PRODUCT_READY_SELECTOR).await
    }

    async fn extract_product(
        &self,
        session: &BrowserSession,
        url: &str,
    ) -> Result<ProductRecord, ScrapeError> {
        let mut record: ProductRecord = session.evaluate_json(PRODUCT_DETAILS).await?;
        if record.url.is_none() {
            record.url = session.current_url().await?.or_else(|| Some(url.to_string()));
        }
        Ok(record)
    }
}

/// `base` with its `page` query parameter set to `page`, other parameters kept
fn with_page(base: &str, page: u32) -> Result<Url, ScrapeError> {
    let mut url = Url::parse(base)
        .map_err(|e| ScrapeError::Browser(anyhow::anyhow!("Invalid URL {base:?}: {e}")))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != "page")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    Ok(url)
}

/// Resolve hrefs against the page they were found on, dropping anything
/// that is not an http(s) link
fn resolve_links(base: &Url, links: Vec<String>) -> Vec<String> {
    links
        .into_iter()
        .filter_map(|link| match base.join(link.trim()) {
            Ok(resolved) if matches!(resolved.scheme(), "http" | "https") => {
                Some(resolved.to_string())
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping unparsable link {link:?}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parameter_replaces_existing_one() {
        let url = with_page("https://www.bukalapak.com/u/toko?page=4&sort=new", 2).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("sort".to_string(), "new".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn listing_url_keeps_search_filters() {
        let scraper = BukalapakScraper::default();
        let url = scraper.listing_page_url(7).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("search[brand]".to_string(), "1".to_string())));
        assert!(pairs.contains(&("page".to_string(), "7".to_string())));
    }

    #[test]
    fn relative_links_become_absolute() {
        let base = Url::parse("https://www.bukalapak.com/products?page=1").unwrap();
        let links = resolve_links(
            &base,
            vec![
                "/p/kamera-123".to_string(),
                "https://www.bukalapak.com/u/toko".to_string(),
                "javascript:void(0)".to_string(),
            ],
        );
        assert_eq!(
            links,
            vec![
                "https://www.bukalapak.com/p/kamera-123".to_string(),
                "https://www.bukalapak.com/u/toko".to_string(),
            ]
        );
    }
}
