use crate::pipeline::PipelineOptions;
use crate::scrapers::listing::CrawlOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Crawl the car auction listings and reconcile them with the local store.
#[derive(Debug, Clone, Parser)]
#[command(name = "auction-scout", version)]
#[command(about = "Crawl car auction listings and track sold, seen and new vehicles")]
pub struct Args {
    /// Site root, without trailing path
    #[arg(long, env = "SCOUT_BASE_URL", default_value = "https://cars.mogo.co.ke")]
    pub base_url: String,

    /// Postgres connection string; when absent the JSON file store is used
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// JSON file used as the store when no database URL is given
    #[arg(long, env = "SCOUT_STORE_FILE", default_value = "listings.json")]
    pub store_file: PathBuf,

    /// Highest listing page that will be requested
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    /// Timeout for a single HTTP request, in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Wall-clock budget for paginating the listings, in seconds
    #[arg(long, default_value_t = 1800)]
    pub crawl_deadline_secs: u64,

    /// Detail pages fetched concurrently
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub detail_concurrency: u16,

    /// Pause between listing pages, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub page_delay_ms: u64,

    /// Mark vanished listings sold even if the crawl stopped early
    #[arg(long)]
    pub mark_sold_on_partial_crawl: bool,

    /// Write the listings inserted by this run to this JSON file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            crawl: CrawlOptions {
                max_pages: self.max_pages,
                deadline: Some(Duration::from_secs(self.crawl_deadline_secs)),
                page_delay: Duration::from_millis(self.page_delay_ms),
            },
            detail_concurrency: usize::from(self.detail_concurrency),
            mark_sold_on_partial_crawl: self.mark_sold_on_partial_crawl,
        }
    }
}
