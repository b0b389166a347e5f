//! Type-safe builder for `CrawlConfig` using the typestate pattern
//!
//! `build()` only exists once the data directory has been set.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use super::types::CrawlConfig;
use crate::crawl_engine::{CrawlError, CrawlResult};

// Type states for the builder
pub struct WithDataDir;

pub struct CrawlConfigBuilder<State = ()> {
    pub(crate) draft: CrawlConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        Self {
            draft: CrawlConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfig {
    /// Create a builder for configuring a `CrawlConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder<()> {
        CrawlConfigBuilder::default()
    }

    /// Reopen a complete config for overrides
    #[must_use]
    pub fn into_builder(self) -> CrawlConfigBuilder<WithDataDir> {
        CrawlConfigBuilder {
            draft: self,
            _phantom: PhantomData,
        }
    }

    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> CrawlResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            CrawlError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> CrawlResult<()> {
        let fail = |msg: String| Err(CrawlError::Config(msg));

        if self.data_dir.as_os_str().is_empty() {
            return fail("data_dir must not be empty".into());
        }
        if self.first_page == 0 {
            return fail("first_page starts at 1".into());
        }
        if self.first_page > self.last_page {
            return fail(format!(
                "first_page {} is after last_page {}",
                self.first_page, self.last_page
            ));
        }
        if self.max_concurrency == 0 {
            return fail("max_concurrency must be at least 1".into());
        }
        if self.task_timeout_secs == 0 || self.content_wait_secs == 0 {
            return fail("task_timeout_secs and content_wait_secs must be non-zero".into());
        }
        if self.event_capacity == 0 {
            return fail("event_capacity must be at least 1".into());
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return fail("viewport dimensions must be non-zero".into());
        }
        if let Err(e) = Url::parse(&self.listing_url) {
            return fail(format!("listing_url {:?} is not a URL: {e}", self.listing_url));
        }
        Ok(())
    }
}

impl<State> CrawlConfigBuilder<State> {
    #[must_use]
    pub fn data_dir(self, dir: impl Into<PathBuf>) -> CrawlConfigBuilder<WithDataDir> {
        CrawlConfigBuilder {
            draft: CrawlConfig {
                data_dir: dir.into(),
                ..self.draft
            },
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl CrawlConfigBuilder<WithDataDir> {
    pub fn build(self) -> CrawlResult<CrawlConfig> {
        self.draft.validate()?;
        Ok(self.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_match_documented_values() {
        let config = CrawlConfig::builder().data_dir("/tmp/store").build().unwrap();
        assert_eq!(config.data_dir(), Path::new("/tmp/store"));
        assert_eq!(config.first_page(), 1);
        assert_eq!(config.last_page(), 99);
        assert_eq!(config.task_timeout(), Duration::from_secs(3600));
        assert_eq!(config.content_wait(), Duration::from_secs(60));
        assert_eq!(config.settle_interval(), Duration::from_millis(500));
        assert!(config.headless());
        assert!(config.max_concurrency() >= 1);
    }

    #[test]
    fn rejects_inverted_page_range() {
        let err = CrawlConfig::builder()
            .data_dir("/tmp/store")
            .page_range(5, 2)
            .build()
            .unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));
    }

    #[test]
    fn rejects_zero_concurrency_and_bad_url() {
        assert!(
            CrawlConfig::builder()
                .data_dir("/tmp/store")
                .max_concurrency(0)
                .build()
                .is_err()
        );
        assert!(
            CrawlConfig::builder()
                .data_dir("/tmp/store")
                .listing_url("not a url")
                .build()
                .is_err()
        );
    }

    #[test]
    fn into_builder_keeps_fields() {
        let config = CrawlConfig::builder()
            .data_dir("/tmp/a")
            .page_range(3, 4)
            .build()
            .unwrap();
        let reopened = config.clone().into_builder().headless(false).build().unwrap();
        assert_eq!(reopened.first_page(), 3);
        assert!(!reopened.headless());
        assert_eq!(reopened.data_dir(), config.data_dir());
    }

    #[test]
    fn navigation_is_bounded_by_task_timeout() {
        let config = CrawlConfig::builder()
            .data_dir("/tmp/store")
            .task_timeout(Duration::from_secs(90))
            .headless(false)
            .build()
            .unwrap();
        let options = config.browser_options();
        assert_eq!(options.navigation_timeout, Duration::from_secs(90));
        assert_eq!(options.navigation_timeout, config.pool_config().task_timeout);
        assert!(!options.headless);
    }
}
