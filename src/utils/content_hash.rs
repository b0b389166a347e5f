//! Content addressing for work items
//!
//! A work item's store key is the SHA-256 of its identity (source URL), hex
//! encoded. Re-discovering the same URL yields the same key, so inserting it
//! again overwrites the existing entry instead of duplicating it.

use sha2::{Digest, Sha256};

/// Length of a digest produced by [`content_hash`]
pub const CONTENT_HASH_LEN: usize = 64;

/// Stable hex digest of `identity`
#[must_use]
pub fn content_hash(identity: &str) -> String {
    hex::encode(Sha256::digest(identity.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn known_digest_is_stable_across_runs() {
        assert_eq!(
            content_hash("https://www.bukalapak.com/p/a"),
            content_hash(&String::from("https://www.bukalapak.com/p/a"))
        );
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn no_collisions_across_realistic_identities() {
        let mut seen = HashSet::new();
        for i in 0..2_000 {
            let product = format!("https://www.bukalapak.com/p/hobi/item-{i}");
            let shop = format!("https://www.bukalapak.com/u/seller{i}?page=1");
            assert!(seen.insert(content_hash(&product)));
            assert!(seen.insert(content_hash(&shop)));
        }
    }

    proptest! {
        #[test]
        fn digest_is_fixed_length_hex(identity in ".*") {
            let digest = content_hash(&identity);
            prop_assert_eq!(digest.len(), CONTENT_HASH_LEN);
            prop_assert!(digest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        }

        #[test]
        fn equal_text_gives_equal_digest(identity in "https://[a-z]{1,12}\\.com/[a-z0-9/-]{0,40}") {
            let copy = identity.clone();
            prop_assert_eq!(content_hash(&identity), content_hash(&copy));
        }
    }
}
