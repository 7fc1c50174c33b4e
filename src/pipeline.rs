//! One full crawl-and-reconcile cycle.
//!
//! The active snapshot is read before any write, then sold/seen updates are
//! applied, and only then are new listings fetched and inserted.

use crate::error::{RecordError, StoreError};
use crate::models::ListingRecord;
use crate::reconcile::reconcile;
use crate::scrapers::detail::DetailExtractor;
use crate::scrapers::listing::{CrawlOptions, CrawlStop, ListingCrawler};
use crate::scrapers::traits::DocumentFetcher;
use crate::scrapers::types::SiteLayout;
use crate::store::ListingStore;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub base_url: String,
    pub crawl: CrawlOptions,
    /// Detail pages fetched at the same time
    pub detail_concurrency: usize,
    /// Apply sold-marking even when the crawl stopped before the end of results
    pub mark_sold_on_partial_crawl: bool,
}

/// What one run did
#[derive(Debug)]
pub struct RunSummary {
    pub pages_fetched: u32,
    pub stop: CrawlStop,
    pub marked_sold: usize,
    /// Vanished records left active because the crawl was incomplete
    pub sold_skipped: usize,
    pub seen_incremented: usize,
    /// Records stored in this run, with their persisted ids
    pub inserted: Vec<ListingRecord>,
    /// New listings that could not be fetched, extracted or stored
    pub failed: usize,
    /// Sold or seen updates the store rejected
    pub write_failures: usize,
}

pub struct Pipeline<'a> {
    fetcher: &'a dyn DocumentFetcher,
    store: &'a dyn ListingStore,
    layout: &'a SiteLayout,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fetcher: &'a dyn DocumentFetcher,
        store: &'a dyn ListingStore,
        layout: &'a SiteLayout,
        options: PipelineOptions,
    ) -> Self {
        Self {
            fetcher,
            store,
            layout,
            options,
        }
    }

    /// Run one cycle.
    ///
    /// Only a failure to read the active listings is returned as an error;
    /// everything after that is logged, counted and skipped.
    pub async fn run(&self) -> Result<RunSummary, StoreError> {
        let active = self.store.list_active().await?;
        info!(active = active.len(), store = self.store.name(), "loaded active listings");

        let crawler = ListingCrawler::new(self.fetcher, self.layout, self.options.crawl.clone());
        let outcome = crawler.crawl(&self.options.base_url).await;
        let complete = outcome.is_complete();

        let plan = reconcile(active, outcome.index);
        info!(
            sold = plan.to_mark_sold.len(),
            seen = plan.to_increment_seen.len(),
            new = plan.new_ids.len(),
            "reconciled against remote index"
        );

        let mut summary = RunSummary {
            pages_fetched: outcome.pages_fetched,
            stop: outcome.stop,
            marked_sold: 0,
            sold_skipped: 0,
            seen_incremented: 0,
            inserted: Vec::new(),
            failed: 0,
            write_failures: 0,
        };

        if complete || self.options.mark_sold_on_partial_crawl {
            for record in &plan.to_mark_sold {
                if self.apply(record, Update::Sold).await {
                    summary.marked_sold += 1;
                } else {
                    summary.write_failures += 1;
                }
            }
        } else if !plan.to_mark_sold.is_empty() {
            summary.sold_skipped = plan.to_mark_sold.len();
            warn!(
                skipped = summary.sold_skipped,
                "crawl did not reach the end of results, leaving vanished listings active"
            );
        }

        for record in &plan.to_increment_seen {
            if self.apply(record, Update::Seen).await {
                summary.seen_incremented += 1;
            } else {
                summary.write_failures += 1;
            }
        }

        let mut new_ids: Vec<_> = plan.new_ids.into_iter().collect();
        new_ids.sort_unstable_by_key(|(id, _)| *id);

        let extractor = DetailExtractor::new(self.layout);
        let extractor = &extractor;
        let mut results = stream::iter(new_ids)
            .map(|(remote_id, url)| async move {
                let result = self.store_new_listing(extractor, remote_id, &url).await;
                (remote_id, url, result)
            })
            .buffer_unordered(self.options.detail_concurrency.max(1));

        while let Some((remote_id, url, result)) = results.next().await {
            match result {
                Ok(record) => {
                    debug!(remote_id, persisted_id = ?record.persisted_id, "inserted listing");
                    summary.inserted.push(record);
                }
                Err(error) => {
                    warn!(remote_id, %url, %error, "skipping listing");
                    summary.failed += 1;
                }
            }
        }

        info!(
            pages = summary.pages_fetched,
            stop = ?summary.stop,
            marked_sold = summary.marked_sold,
            sold_skipped = summary.sold_skipped,
            seen = summary.seen_incremented,
            inserted = summary.inserted.len(),
            failed = summary.failed,
            write_failures = summary.write_failures,
            "run finished"
        );
        Ok(summary)
    }

    /// Send one sold/seen update to the store; false if it was rejected
    async fn apply(&self, record: &ListingRecord, update: Update) -> bool {
        let Some(persisted_id) = record.persisted_id else {
            warn!(remote_id = record.remote_id, "active listing has no persisted id");
            return false;
        };

        let result = match update {
            Update::Sold => self.store.mark_sold(persisted_id).await,
            Update::Seen => self.store.increment_seen(persisted_id).await,
        };
        match result {
            Ok(()) => {
                debug!(remote_id = record.remote_id, ?update, "updated listing");
                true
            }
            Err(error) => {
                warn!(remote_id = record.remote_id, ?update, %error, "update failed");
                false
            }
        }
    }

    async fn store_new_listing(
        &self,
        extractor: &DetailExtractor<'_>,
        remote_id: u64,
        url: &str,
    ) -> Result<ListingRecord, RecordError> {
        let mut record = {
            let document = self.fetcher.fetch(url).await?;
            extractor.extract(&document, remote_id, url)?
        };
        let persisted_id = self.store.insert(&record).await?;
        record.persisted_id = Some(persisted_id);
        record.seen_count = 1;
        Ok(record)
    }
}

#[derive(Debug, Clone, Copy)]
enum Update {
    Sold,
    Seen,
}
