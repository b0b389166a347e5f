use anyhow::Result;
use chromiumoxide::Browser;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::BrowserOptions;
use super::session::BrowserSession;
use super::setup::launch_browser;
use crate::worker_pool::ContextProvider;

/// Hands each pool task its own incognito session in one shared Chromium
pub struct ChromiumProvider {
    browser: RwLock<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    user_data_dir: PathBuf,
    options: BrowserOptions,
}

impl ChromiumProvider {
    pub async fn launch(options: BrowserOptions) -> Result<Self> {
        let (browser, handler, user_data_dir) = launch_browser(&options).await?;
        info!(
            "Chromium ready (headless: {}, viewport: {}x{})",
            options.headless, options.viewport.0, options.viewport.1
        );
        Ok(Self {
            browser: RwLock::new(Some(browser)),
            handler: Mutex::new(Some(handler)),
            user_data_dir,
            options,
        })
    }
}

impl ContextProvider for ChromiumProvider {
    type Context = BrowserSession;

    async fn acquire(&self) -> Result<BrowserSession> {
        let guard = self.browser.read().await;
        let Some(browser) = guard.as_ref() else {
            anyhow::bail!("Browser already shut down");
        };
        BrowserSession::open(browser, &self.options).await
    }

    async fn release(&self, session: BrowserSession) {
        let guard = self.browser.read().await;
        if let Some(browser) = guard.as_ref() {
            session.close(browser).await;
        }
    }

    async fn shutdown(&self) {
        if let Some(mut browser) = self.browser.write().await.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {e}");
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser exit: {e}");
            }
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            warn!(
                "Failed to remove browser profile {}: {e}",
                self.user_data_dir.display()
            );
        }
        info!("Chromium shut down");
    }
}
