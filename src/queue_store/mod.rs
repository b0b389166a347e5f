//! Durable, namespaced key/value queue store
//!
//! Every namespace is a directory under the store root and every entry is one
//! JSON file named by its key, with metadata kept alongside in `<key>.meta`.
//! All mutations made through a store handle (or any of its clones) are
//! announced on a broadcast change feed.

mod core;
mod entries;
pub mod errors;
mod fs_io;
mod metadata;
mod subscription;
pub mod types;

pub use core::QueueStore;
pub use errors::StoreError;
pub use types::{ChangeKind, Metadata, Namespace, StoreEvent};
