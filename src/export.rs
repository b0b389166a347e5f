//! CSV export of processed products

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::queue_store::{Namespace, QueueStore};
use crate::site::ProductRecord;

/// Column order of the export
pub const EXPORT_COLUMNS: [&str; 14] = [
    "url",
    "title",
    "image",
    "originalPrice",
    "discountPrice",
    "discountPercentage",
    "sellerLocation",
    "sellerName",
    "feedbackPositive",
    "feedbackTotal",
    "productInfo",
    "condition",
    "processTime",
    "description",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// Entries that were null, undecodable or missing a title or image
    pub skipped: usize,
}

/// Export file name for a given timestamp
#[must_use]
pub fn export_file_name(unix_millis: i64) -> String {
    format!("export-{unix_millis}.csv")
}

/// Write every complete processed product to `out_dir/export-<millis>.csv`
pub async fn export_products(store: &QueueStore, out_dir: &Path) -> Result<ExportSummary> {
    let path = out_dir.join(export_file_name(chrono::Utc::now().timestamp_millis()));
    export_products_to(store, &path).await
}

/// Write every complete processed product to `path`
pub async fn export_products_to(store: &QueueStore, path: &Path) -> Result<ExportSummary> {
    let mut rows = Vec::new();
    let mut skipped = 0;

    for key in store.list_keys(Namespace::ProcessedProduct).await? {
        match store
            .get::<Option<ProductRecord>>(Namespace::ProcessedProduct, &key)
            .await
        {
            Ok(Some(Some(record))) if record.is_complete() => rows.push(record),
            Ok(_) => skipped += 1,
            Err(e) if e.is_unavailable() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping processed product {key}: {e}");
                skipped += 1;
            }
        }
    }
    info!("{} products to export, {} skipped", rows.len(), skipped);

    let bytes = render_csv(&rows)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Export written to {}", path.display());
    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: rows.len(),
        skipped,
    })
}

/// Headered CSV with every field quoted; missing fields are empty
fn render_csv(records: &[ProductRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(EXPORT_COLUMNS)
        .context("Failed to write CSV header")?;
    for record in records {
        let fields = [
            &record.url,
            &record.title,
            &record.image,
            &record.original_price,
            &record.discount_price,
            &record.discount_percentage,
            &record.seller_location,
            &record.seller_name,
            &record.feedback_positive,
            &record.feedback_total,
            &record.product_info,
            &record.condition,
            &record.process_time,
            &record.description,
        ];
        writer
            .write_record(fields.iter().map(|f| f.as_deref().unwrap_or("")))
            .context("Failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {e}"))
}
