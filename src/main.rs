use anyhow::{Context, Result};
use auction_scout::config::Args;
use auction_scout::models::ListingRecord;
use auction_scout::pipeline::Pipeline;
use auction_scout::scrapers::{HttpFetcher, SiteLayout};
use auction_scout::store::{JsonFileStore, ListingStore, PgListingStore};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Store or HTTP client could not be set up, or the store could not be read
const EXIT_BOOTSTRAP: u8 = 2;
/// The run finished but its export file could not be written
const EXIT_EXPORT: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("🚗 Auction Scout");
    info!(base_url = %args.base_url, "starting run");

    let (fetcher, store) = match bootstrap(&args).await {
        Ok(parts) => parts,
        Err(e) => {
            error!("bootstrap failed: {e:#}");
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    };

    let layout = SiteLayout::default();
    let pipeline = Pipeline::new(&fetcher, &*store, &layout, args.pipeline_options());
    let summary = match pipeline.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("could not read active listings: {e}");
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    };

    info!("✅ Inserted {} new listings", summary.inserted.len());

    if let Some(path) = &args.export {
        if let Err(e) = export(path, &summary.inserted).await {
            error!("export failed: {e:#}");
            return ExitCode::from(EXIT_EXPORT);
        }
        info!("💾 Saved new listings to {}", path.display());
    }

    ExitCode::SUCCESS
}

async fn bootstrap(args: &Args) -> Result<(HttpFetcher, Box<dyn ListingStore>)> {
    let fetcher = HttpFetcher::new(args.request_timeout()).context("Failed to create HTTP client")?;

    let store: Box<dyn ListingStore> = match &args.database_url {
        Some(url) => Box::new(
            PgListingStore::connect(url)
                .await
                .context("Failed to connect to database")?,
        ),
        None => Box::new(
            JsonFileStore::open(&args.store_file)
                .await
                .with_context(|| format!("Failed to open store file {}", args.store_file.display()))?,
        ),
    };
    store
        .ensure_schema()
        .await
        .with_context(|| format!("Failed to prepare {} store", store.name()))?;

    Ok((fetcher, store))
}

async fn export(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
