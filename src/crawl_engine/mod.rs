//! Crawl Engine Module
//!
//! The three crawl flows (directory discovery, shop pagination and product
//! extraction) as explicit state machines, plus the live dispatcher and the
//! orchestrator that runs them on the worker pool.

pub mod crawl_types;
pub mod directory;
pub mod dispatcher;
pub mod orchestrator;
pub mod product;
pub mod shop;
pub mod tasks;

pub use crawl_types::{CrawlError, CrawlResult, ItemKind, RunSummary, WorkItem};
pub use directory::{DirectoryFlow, DirectoryState};
pub use dispatcher::{Dispatch, DispatchStats, LiveDispatcher, dispatch_backlog};
pub use orchestrator::{crawl_marketplace, run_crawl};
pub use product::{ProductFlow, ProductState};
pub use shop::{LAST_PAGE_FIELD, MAX_PAGE_FIELD, ShopCursor, ShopFlow, ShopState};
pub use tasks::CrawlTasks;
