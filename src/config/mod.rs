//! Configuration module for crawl runs
//!
//! This module provides the `CrawlConfig` struct and its type-safe builder
//! with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{CrawlConfigBuilder, WithDataDir};
pub use types::{CrawlConfig, DEFAULT_DATA_DIR};
