//! Test utilities shared by the shopcrawl integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shopcrawl::crawl_engine::Dispatch;
use shopcrawl::worker_pool::{PoolConfig, PoolError};
use shopcrawl::{
    ContextProvider, ListingPage, ProductRecord, QueueStore, ScrapeError, ShopPage, SiteScraper,
    WorkItem,
};
use tempfile::TempDir;

/// Opens a store in a fresh temporary directory. Keep the `TempDir` alive.
pub async fn temp_store() -> (TempDir, QueueStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = QueueStore::open(dir.path().join("data"), 1024)
        .await
        .expect("open store");
    (dir, store)
}

/// Pool config suited to tests: short settle window, no progress log
pub fn test_pool_config(max_concurrency: usize) -> PoolConfig {
    PoolConfig {
        max_concurrency,
        task_timeout: Duration::from_secs(30),
        settle_interval: Duration::from_millis(100),
        monitor_interval: None,
    }
}

/// Replace a directory with a plain file so every store operation under it
/// fails with an I/O error
pub fn break_directory(path: &Path) {
    std::fs::remove_dir_all(path).expect("remove store dir");
    std::fs::write(path, b"not a directory").expect("write blocker file");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSession {
    pub id: u64,
}

/// Counters behind a [`CountingProvider`]
#[derive(Default)]
pub struct ProviderCounters {
    next_id: AtomicU64,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub active: AtomicUsize,
    pub peak_active: AtomicUsize,
    pub fail_acquire: AtomicBool,
    pub shut_down: AtomicBool,
}

/// Context provider that counts acquisitions and releases. Clones share the
/// counters, so a test keeps one clone and hands the other to the pool.
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub counters: Arc<ProviderCounters>,
}

impl CountingProvider {
    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn peak_active(&self) -> usize {
        self.counters.peak_active.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.counters.shut_down.load(Ordering::SeqCst)
    }

    pub fn fail_acquire(&self, fail: bool) {
        self.counters.fail_acquire.store(fail, Ordering::SeqCst);
    }
}

impl ContextProvider for CountingProvider {
    type Context = TestSession;

    async fn acquire(&self) -> anyhow::Result<TestSession> {
        let c = &self.counters;
        if c.fail_acquire.load(Ordering::SeqCst) {
            anyhow::bail!("no browser available");
        }
        c.acquired.fetch_add(1, Ordering::SeqCst);
        let now = c.active.fetch_add(1, Ordering::SeqCst) + 1;
        c.peak_active.fetch_max(now, Ordering::SeqCst);
        Ok(TestSession {
            id: c.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn release(&self, _context: TestSession) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }

    async fn shutdown(&self) {
        self.counters.shut_down.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Listing(u32),
    Shop(String, u32),
    Product(String),
}

#[derive(Debug, Clone)]
pub enum ProductBehavior {
    Record(ProductRecord),
    /// The readiness marker never shows up
    Timeout,
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Scripted scraper. Unknown listing pages time out, unknown shop pages have
/// no products and no pagination, unknown products get a minimal record.
#[derive(Default)]
pub struct FakeScraper {
    pub listings: HashMap<u32, ListingPage>,
    pub shops: HashMap<(String, u32), ShopPage>,
    pub products: HashMap<String, ProductBehavior>,
    pub calls: Mutex<Vec<Call>>,
    /// Runs inside every listing scrape, after the fetch
    pub on_listing: Option<Hook>,
}

impl FakeScraper {
    pub fn with_listing(mut self, page: u32, products: &[&str], shops: &[&str]) -> Self {
        self.listings.insert(
            page,
            ListingPage {
                products: products.iter().map(|s| s.to_string()).collect(),
                shops: shops.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_shop_page(mut self, shop: &str, page: u32, products: &[&str], max_page: u32) -> Self {
        self.shops.insert(
            (shop.to_string(), page),
            ShopPage {
                products: products.iter().map(|s| s.to_string()).collect(),
                max_page,
            },
        );
        self
    }

    pub fn with_product(mut self, url: &str, record: ProductRecord) -> Self {
        self.products
            .insert(url.to_string(), ProductBehavior::Record(record));
        self
    }

    pub fn with_missing_product(mut self, url: &str) -> Self {
        self.products.insert(url.to_string(), ProductBehavior::Timeout);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shop_fetches(&self, shop: &str) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Shop(url, page) if url == shop => Some(page),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn timeout(url: &str, selector: &str) -> ScrapeError {
        ScrapeError::ContentTimeout {
            url: url.to_string(),
            selector: selector.to_string(),
            waited: Duration::from_millis(10),
        }
    }
}

/// Record a product page would produce
pub fn record_for(url: &str, title: &str) -> ProductRecord {
    ProductRecord {
        url: Some(url.to_string()),
        title: Some(title.to_string()),
        image: Some(format!("{url}/large.jpg")),
        ..Default::default()
    }
}

impl SiteScraper for FakeScraper {
    type Session = TestSession;

    async fn scrape_listing(
        &self,
        _session: &TestSession,
        page: u32,
    ) -> Result<ListingPage, ScrapeError> {
        self.record(Call::Listing(page));
        if let Some(hook) = &self.on_listing {
            hook();
        }
        self.listings
            .get(&page)
            .cloned()
            .ok_or_else(|| Self::timeout(&format!("listing/{page}"), ".card"))
    }

    async fn scrape_shop(
        &self,
        _session: &TestSession,
        shop_url: &str,
        page: u32,
    ) -> Result<ShopPage, ScrapeError> {
        self.record(Call::Shop(shop_url.to_string(), page));
        Ok(self
            .shops
            .get(&(shop_url.to_string(), page))
            .cloned()
            .unwrap_or_default())
    }

    async fn open_product(&self, _session: &TestSession, url: &str) -> Result<(), ScrapeError> {
        self.record(Call::Product(url.to_string()));
        Ok(())
    }

    async fn await_product(&self, _session: &TestSession, url: &str) -> Result<(), ScrapeError> {
        match self.products.get(url) {
            Some(ProductBehavior::Timeout) => Err(Self::timeout(url, "h1")),
            _ => Ok(()),
        }
    }

    async fn extract_product(
        &self,
        _session: &TestSession,
        url: &str,
    ) -> Result<ProductRecord, ScrapeError> {
        match self.products.get(url) {
            Some(ProductBehavior::Record(record)) => Ok(record.clone()),
            _ => Ok(record_for(url, "untitled")),
        }
    }
}

/// Dispatch target that only records what it was given
#[derive(Default, Clone)]
pub struct RecordingDispatch {
    pub items: Arc<Mutex<Vec<WorkItem>>>,
    pub closed: Arc<AtomicBool>,
}

impl RecordingDispatch {
    pub fn items(&self) -> Vec<WorkItem> {
        self.items.lock().unwrap().clone()
    }
}

impl Dispatch for RecordingDispatch {
    fn dispatch(&self, item: WorkItem) -> Result<(), PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }
        self.items.lock().unwrap().push(item);
        Ok(())
    }
}

/// Poll `check` every 10ms until it holds or `within` elapses
pub async fn eventually(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
