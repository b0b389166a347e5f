use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Links found on one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub products: Vec<String>,
    pub shops: Vec<String>,
}

/// Links found on one page of a shop, plus the page count its pagination
/// control advertises (1 when there is no pagination control)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopPage {
    pub products: Vec<String>,
    pub max_page: u32,
}

impl Default for ShopPage {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            max_page: 1,
        }
    }
}

/// Fields extracted from a product page. Any field may be missing, since
/// source pages vary; incomplete records are filtered at export time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub url: Option<String>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub original_price: Option<String>,
    pub discount_price: Option<String>,
    pub discount_percentage: Option<String>,
    pub seller_location: Option<String>,
    pub seller_name: Option<String>,
    pub feedback_positive: Option<String>,
    pub feedback_total: Option<String>,
    pub product_info: Option<String>,
    pub condition: Option<String>,
    pub process_time: Option<String>,
    pub description: Option<String>,
}

impl ProductRecord {
    /// A record is exportable once it has a non-empty title and image.
    /// Whitespace counts as content.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.title) && present(&self.image)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The page's readiness marker did not appear in time
    #[error("Timed out after {waited:?} waiting for {selector:?} at {url}")]
    ContentTimeout {
        url: String,
        selector: String,
        waited: Duration,
    },

    #[error("Browser operation failed: {0:#}")]
    Browser(anyhow::Error),
}

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Browser(err)
    }
}
