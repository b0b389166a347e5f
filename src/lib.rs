pub mod browser;
pub mod config;
pub mod crawl_engine;
pub mod export;
pub mod queue_store;
pub mod site;
pub mod utils;
pub mod worker_pool;

pub use browser::{BrowserOptions, BrowserSession, ChromiumProvider};
pub use config::CrawlConfig;
pub use crawl_engine::{
    CrawlError, CrawlResult, ItemKind, LiveDispatcher, RunSummary, WorkItem, crawl_marketplace,
    run_crawl,
};
pub use export::{ExportSummary, export_products};
pub use queue_store::{ChangeKind, Metadata, Namespace, QueueStore, StoreError, StoreEvent};
pub use site::{BukalapakScraper, ListingPage, ProductRecord, ScrapeError, ShopPage, SiteScraper};
pub use utils::content_hash;
pub use worker_pool::{ContextProvider, PoolConfig, PoolStatsSnapshot, TaskFailure, WorkerPool};
