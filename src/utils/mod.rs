pub mod constants;
pub mod content_hash;

pub use constants::*;
pub use content_hash::{CONTENT_HASH_LEN, content_hash};
