//! Core configuration type for crawl runs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{
    DEFAULT_CONTENT_WAIT, DEFAULT_EVENT_CAPACITY, DEFAULT_FIRST_PAGE, DEFAULT_LAST_PAGE,
    DEFAULT_LISTING_URL, DEFAULT_MONITOR_INTERVAL, DEFAULT_SCROLL_INTERVAL, DEFAULT_SCROLL_STEP_PX,
    DEFAULT_SETTLE_INTERVAL, DEFAULT_TASK_TIMEOUT, DEFAULT_VIEWPORT, default_max_concurrency,
};

/// Default store location relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "data";

/// Main configuration struct for crawl runs
///
/// Loaded from JSON, every missing field takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Root of the queue store
    pub(crate) data_dir: PathBuf,
    /// Search listing; the page index is set as its `page` query parameter
    pub(crate) listing_url: String,
    /// Inclusive listing page range
    pub(crate) first_page: u32,
    pub(crate) last_page: u32,
    pub(crate) max_concurrency: usize,
    pub(crate) task_timeout_secs: u64,
    /// Bounded wait for a page's primary content marker
    pub(crate) content_wait_secs: u64,
    pub(crate) settle_interval_ms: u64,
    /// Period of the pool progress log line; `None` turns it off
    pub(crate) monitor_interval_secs: Option<u64>,
    /// Change feed buffer size
    pub(crate) event_capacity: usize,
    pub(crate) headless: bool,
    pub(crate) viewport_width: u32,
    pub(crate) viewport_height: u32,
    /// Also block images on product pages. Listing pages always block them.
    pub(crate) block_product_images: bool,
    pub(crate) scroll_step_px: u32,
    pub(crate) scroll_interval_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            first_page: DEFAULT_FIRST_PAGE,
            last_page: DEFAULT_LAST_PAGE,
            max_concurrency: default_max_concurrency(),
            task_timeout_secs: DEFAULT_TASK_TIMEOUT.as_secs(),
            content_wait_secs: DEFAULT_CONTENT_WAIT.as_secs(),
            settle_interval_ms: DEFAULT_SETTLE_INTERVAL.as_millis() as u64,
            monitor_interval_secs: Some(DEFAULT_MONITOR_INTERVAL.as_secs()),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            headless: true,
            viewport_width: DEFAULT_VIEWPORT.0,
            viewport_height: DEFAULT_VIEWPORT.1,
            block_product_images: false,
            scroll_step_px: DEFAULT_SCROLL_STEP_PX,
            scroll_interval_ms: DEFAULT_SCROLL_INTERVAL.as_millis() as u64,
        }
    }
}
