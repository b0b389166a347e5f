//! Headless Chromium execution contexts for the worker pool

mod provider;
pub mod session;
pub mod setup;

pub use provider::ChromiumProvider;
pub use session::BrowserSession;
pub use setup::{find_browser_executable, launch_browser};

pub use chromiumoxide::cdp::browser_protocol::network::ResourceType;

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserOptions {
    pub headless: bool,
    pub viewport: (u32, u32),
    /// Bound on a single navigation and on each CDP request
    pub navigation_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: crate::utils::DEFAULT_VIEWPORT,
            navigation_timeout: crate::utils::DEFAULT_TASK_TIMEOUT,
        }
    }
}
