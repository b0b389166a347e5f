//! Getter methods for `CrawlConfig`
//!
//! Besides plain accessors, this derives the option structs handed to the
//! worker pool, the browser and the scraper.

use std::path::Path;
use std::time::Duration;

use super::types::CrawlConfig;
use crate::browser::BrowserOptions;
use crate::site::bukalapak::ScraperOptions;
use crate::worker_pool::PoolConfig;

impl CrawlConfig {
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    #[must_use]
    pub fn first_page(&self) -> u32 {
        self.first_page
    }

    #[must_use]
    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    #[must_use]
    pub fn content_wait(&self) -> Duration {
        Duration::from_secs(self.content_wait_secs)
    }

    #[must_use]
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    #[must_use]
    pub fn monitor_interval(&self) -> Option<Duration> {
        self.monitor_interval_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    #[must_use]
    pub fn block_product_images(&self) -> bool {
        self.block_product_images
    }

    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_concurrency: self.max_concurrency,
            task_timeout: self.task_timeout(),
            settle_interval: self.settle_interval(),
            monitor_interval: self.monitor_interval(),
        }
    }

    #[must_use]
    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.headless,
            viewport: self.viewport(),
            navigation_timeout: self.task_timeout(),
        }
    }

    #[must_use]
    pub fn scraper_options(&self) -> ScraperOptions {
        ScraperOptions {
            listing_url: self.listing_url.clone(),
            content_wait: self.content_wait(),
            block_product_images: self.block_product_images,
            scroll_step_px: self.scroll_step_px,
            scroll_interval: Duration::from_millis(self.scroll_interval_ms),
        }
    }
}
