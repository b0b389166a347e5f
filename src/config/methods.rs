//! Builder methods available for all states

use std::time::Duration;

use super::builder::CrawlConfigBuilder;

impl<State> CrawlConfigBuilder<State> {
    #[must_use]
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.draft.listing_url = url.into();
        self
    }

    /// Inclusive range of listing pages to discover
    #[must_use]
    pub fn page_range(mut self, first: u32, last: u32) -> Self {
        self.draft.first_page = first;
        self.draft.last_page = last;
        self
    }

    #[must_use]
    pub fn first_page(mut self, page: u32) -> Self {
        self.draft.first_page = page;
        self
    }

    #[must_use]
    pub fn last_page(mut self, page: u32) -> Self {
        self.draft.last_page = page;
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, workers: usize) -> Self {
        self.draft.max_concurrency = workers;
        self
    }

    #[must_use]
    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.draft.task_timeout_secs = timeout.as_secs();
        self
    }

    #[must_use]
    pub fn content_wait(mut self, wait: Duration) -> Self {
        self.draft.content_wait_secs = wait.as_secs();
        self
    }

    #[must_use]
    pub fn settle_interval(mut self, interval: Duration) -> Self {
        self.draft.settle_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Period of the pool progress log; `None` disables it
    #[must_use]
    pub fn monitor_interval(mut self, interval: Option<Duration>) -> Self {
        self.draft.monitor_interval_secs = interval.map(|d| d.as_secs().max(1));
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.draft.event_capacity = capacity;
        self
    }

    /// Set browser headless mode. Headed mode is for watching a crawl locally.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.draft.headless = headless;
        self
    }

    #[must_use]
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.draft.viewport_width = width;
        self.draft.viewport_height = height;
        self
    }

    #[must_use]
    pub fn block_product_images(mut self, block: bool) -> Self {
        self.draft.block_product_images = block;
        self
    }

    /// Auto-scroll step and pause between steps
    #[must_use]
    pub fn scroll(mut self, step_px: u32, interval: Duration) -> Self {
        self.draft.scroll_step_px = step_px;
        self.draft.scroll_interval_ms = interval.as_millis() as u64;
        self
    }
}
