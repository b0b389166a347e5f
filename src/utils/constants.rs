//! Shared defaults used by the config builder and the scraper
//!
//! Kept in one place so the CLI, the builder and the tests agree.

use std::time::Duration;

/// Marketplace search listing, brand-filtered and sorted by last relist
pub const DEFAULT_LISTING_URL: &str =
    "https://www.bukalapak.com/products?search%5Bbrand%5D=1&search%5Bsort_by%5D=last_relist_at%3Adesc";

pub const DEFAULT_FIRST_PAGE: u32 = 1;
pub const DEFAULT_LAST_PAGE: u32 = 99;

/// Wall-clock budget of a single pool task
///
/// Slow listing pages with many lazy images routinely take minutes.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(3600);

/// How long to wait for the primary content marker of a page
pub const DEFAULT_CONTENT_WAIT: Duration = Duration::from_secs(60);

/// Quiescence recheck window for `WorkerPool::await_idle`
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(500);

pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);

/// Change feed buffer; a subscriber further behind than this rescans
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

pub const DEFAULT_VIEWPORT: (u32, u32) = (1920, 1080);

pub const DEFAULT_SCROLL_STEP_PX: u32 = 100;
pub const DEFAULT_SCROLL_INTERVAL: Duration = Duration::from_millis(500);

/// Chrome user agent string for stealth mode
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Default concurrency: two workers per hardware thread
#[must_use]
pub fn default_max_concurrency() -> usize {
    num_cpus::get().saturating_mul(2).max(1)
}
