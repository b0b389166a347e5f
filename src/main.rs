// shopcrawl: resumable marketplace crawler and CSV exporter.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shopcrawl::config::DEFAULT_DATA_DIR;
use shopcrawl::{CrawlConfig, QueueStore, crawl_marketplace, export_products};

#[derive(Parser, Debug)]
#[command(name = "shopcrawl")]
#[command(about = "Crawl marketplace listings, shops and products into a resumable on-disk queue")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run (or resume) a crawl until no work is left
    Crawl {
        #[arg(long, help = "Queue store directory [default: ./data]")]
        data_dir: Option<PathBuf>,

        #[arg(long, help = "JSON config file; flags override its values")]
        config: Option<PathBuf>,

        #[arg(long, help = "First listing page to discover")]
        first_page: Option<u32>,

        #[arg(long, help = "Last listing page to discover (inclusive)")]
        last_page: Option<u32>,

        #[arg(long, help = "Concurrent browser sessions [default: 2 x CPUs]")]
        concurrency: Option<usize>,

        #[arg(long, help = "Show the browser window")]
        headful: bool,
    },
    /// Export processed products to a CSV file
    Export {
        #[arg(long, default_value = DEFAULT_DATA_DIR, help = "Queue store directory")]
        data_dir: PathBuf,

        #[arg(long, default_value = ".", help = "Directory for the export file")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopcrawl=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match Cli::parse().command {
        Commands::Crawl {
            data_dir,
            config,
            first_page,
            last_page,
            concurrency,
            headful,
        } => {
            let mut builder = match config {
                Some(path) => CrawlConfig::from_json_file(path)?.into_builder(),
                None => CrawlConfig::builder().data_dir(DEFAULT_DATA_DIR),
            };
            if let Some(dir) = data_dir {
                builder = builder.data_dir(dir);
            }
            if let Some(page) = first_page {
                builder = builder.first_page(page);
            }
            if let Some(page) = last_page {
                builder = builder.last_page(page);
            }
            if let Some(workers) = concurrency {
                builder = builder.max_concurrency(workers);
            }
            if headful {
                builder = builder.headless(false);
            }
            let config = builder.build()?;

            let summary = crawl_marketplace(&config).await?;
            info!(
                "Run complete: {} listing pages crawled, {} skipped, {} tasks succeeded, {} failed",
                summary.listing_seeded,
                summary.listing_skipped,
                summary.stats.succeeded,
                summary.stats.failed
            );
        }
        Commands::Export { data_dir, out_dir } => {
            let store = QueueStore::open(&data_dir, 1).await?;
            let summary = export_products(&store, &out_dir).await?;
            info!(
                "Exported {} products to {} ({} skipped)",
                summary.rows,
                summary.path.display(),
                summary.skipped
            );
        }
    }

    Ok(())
}
