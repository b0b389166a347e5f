//! One isolated browser session per pool task
//!
//! A session is an incognito browser context with a single page. Requests
//! are intercepted through the CDP Fetch domain so that blocked resource
//! types never load.

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::BrowserOptions;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Handle to an open session; clones share the page
#[derive(Debug, Clone)]
pub struct BrowserSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    page: Page,
    context_id: BrowserContextId,
    blocked: watch::Sender<Vec<ResourceType>>,
    interceptor: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl BrowserSession {
    /// Create a browser context and a blank page in it, with the viewport set
    /// and request interception running
    pub async fn open(browser: &Browser, options: &BrowserOptions) -> Result<Self> {
        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .context("Failed to create browser context")?
            .result
            .browser_context_id;

        match Self::open_page(browser, context_id.clone(), options).await {
            Ok(session) => Ok(session),
            Err(e) => {
                // Do not leak the context when the page never came up
                if let Err(dispose) = browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await
                {
                    warn!("Failed to dispose browser context: {dispose}");
                }
                Err(e)
            }
        }
    }

    async fn open_page(
        browser: &Browser,
        context_id: BrowserContextId,
        options: &BrowserOptions,
    ) -> Result<Self> {
        let viewport = options.viewport;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(anyhow::Error::msg)?;
        let page = browser
            .new_page(target)
            .await
            .context("Failed to open page")?;

        page.execute(
            SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(viewport.0))
                .height(i64::from(viewport.1))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(anyhow::Error::msg)?,
        )
        .await
        .context("Failed to set viewport")?;

        let paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .context("Failed to listen for paused requests")?;
        page.execute(
            EnableParams::builder()
                .pattern(
                    RequestPattern::builder()
                        .url_pattern("*")
                        .request_stage(RequestStage::Request)
                        .build(),
                )
                .build(),
        )
        .await
        .context("Failed to enable request interception")?;

        let (blocked, blocked_rx) = watch::channel(Vec::new());
        let interceptor = tokio::spawn(intercept_requests(page.clone(), paused, blocked_rx));

        debug!("Opened browser session in context {context_id:?}");
        Ok(Self {
            inner: Arc::new(SessionInner {
                page,
                context_id,
                blocked,
                interceptor,
                navigation_timeout: options.navigation_timeout,
            }),
        })
    }

    /// Replace the set of resource types that must not load
    pub fn block_resources(&self, types: &[ResourceType]) {
        self.inner.blocked.send_replace(types.to_vec());
    }

    /// Navigate and wait for the load to finish
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = &self.inner.page;
        let load = async {
            page.goto(url)
                .await
                .with_context(|| format!("Failed to navigate to {url}"))?;
            page.wait_for_navigation()
                .await
                .with_context(|| format!("Failed waiting for {url} to load"))?;
            Ok::<(), anyhow::Error>(())
        };
        let limit = self.inner.navigation_timeout;
        match tokio::time::timeout(limit, load).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "Navigation to {url} timed out after {}s",
                limit.as_secs()
            )),
        }
    }

    /// Final URL of the page after redirects
    pub async fn current_url(&self) -> Result<Option<String>> {
        self.inner
            .page
            .url()
            .await
            .context("Failed to read page URL")
    }

    /// Evaluate a script (awaiting a returned promise) and decode its value
    pub async fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(anyhow::Error::msg)?;
        let result = self
            .inner
            .page
            .evaluate_expression(params)
            .await
            .context("Failed to evaluate script")?;
        result
            .into_value()
            .context("Failed to decode script result")
    }

    /// Poll for `selector` until it matches or `wait` elapses.
    /// Returns whether the element appeared.
    pub async fn wait_for_selector(&self, selector: &str, wait: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.inner.page.find_element(selector).await.is_ok() {
                trace!("{selector} appeared after {:?}", start.elapsed());
                return true;
            }
            if start.elapsed() >= wait {
                return false;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    /// Close the page and dispose its browser context
    pub async fn close(&self, browser: &Browser) {
        self.inner.interceptor.abort();
        if let Err(e) = self.inner.page.clone().close().await {
            debug!("Page close failed: {e}");
        }
        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(self.inner.context_id.clone()))
            .await
        {
            warn!("Failed to dispose browser context: {e}");
        }
    }
}

async fn intercept_requests(
    page: Page,
    mut paused: EventStream<EventRequestPaused>,
    blocked: watch::Receiver<Vec<ResourceType>>,
) {
    while let Some(event) = paused.next().await {
        let block = blocked.borrow().contains(&event.resource_type);
        let outcome = if block {
            page.execute(FailRequestParams::new(
                event.request_id.clone(),
                ErrorReason::BlockedByClient,
            ))
            .await
            .map(|_| ())
        } else {
            page.execute(ContinueRequestParams::new(event.request_id.clone()))
                .await
                .map(|_| ())
        };
        if let Err(e) = outcome {
            // Requests of a page that is navigating away can no longer be resumed
            trace!("Paused request {:?} not resolved: {e}", event.request_id);
        }
    }
}
