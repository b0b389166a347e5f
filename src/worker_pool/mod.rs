//! Bounded-concurrency task pool with isolated per-task execution contexts
//!
//! Tasks are submitted with a label and a closure receiving a fresh execution
//! context from a [`ContextProvider`]. At most `max_concurrency` tasks run at
//! once; each is bounded by `task_timeout`, and its context is released on
//! every exit path before the concurrency slot is freed.

mod config;
mod core;
mod errors;
mod monitor;
mod provider;
mod stats;

pub use config::PoolConfig;
pub use core::WorkerPool;
pub use errors::{PoolError, TaskFailure};
pub use monitor::{LoggingMonitor, TaskMonitor};
pub use provider::ContextProvider;
pub use stats::{PoolStats, PoolStatsSnapshot};
