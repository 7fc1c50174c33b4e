//! Paginated crawl of the auction listing pages.

use crate::error::FetchError;
use crate::models::RemoteIndex;
use crate::scrapers::locator::{find_all, locate_signature, TreeNode};
use crate::scrapers::traits::DocumentFetcher;
use crate::scrapers::types::SiteLayout;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static ID_AFTER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)/").expect("id pattern is valid"));

/// Limits applied to one crawl
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Highest page number that will be requested
    pub max_pages: u32,
    /// Wall-clock budget for the whole crawl
    pub deadline: Option<Duration>,
    /// Pause between consecutive listing pages
    pub page_delay: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 500,
            deadline: None,
            page_delay: Duration::ZERO,
        }
    }
}

/// Why the crawl loop ended
#[derive(Debug)]
pub enum CrawlStop {
    /// A page came back without a results grid
    EndOfResults,
    /// `max_pages` pages were fetched and every one had results
    PageLimit,
    DeadlineExceeded,
    /// A listing page could not be fetched; the index holds earlier pages only
    FetchFailed { page: u32, error: FetchError },
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub index: RemoteIndex,
    /// Pages that were fetched and contained a results grid
    pub pages_fetched: u32,
    pub stop: CrawlStop,
}

impl CrawlOutcome {
    /// True only when pagination ran to its natural end
    pub fn is_complete(&self) -> bool {
        matches!(self.stop, CrawlStop::EndOfResults)
    }
}

/// Walks `/auction?page=N` from page 1 until the results grid disappears
pub struct ListingCrawler<'a> {
    fetcher: &'a dyn DocumentFetcher,
    layout: &'a SiteLayout,
    options: CrawlOptions,
}

impl<'a> ListingCrawler<'a> {
    pub fn new(fetcher: &'a dyn DocumentFetcher, layout: &'a SiteLayout, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            layout,
            options,
        }
    }

    /// Build the remote index for `base_url`.
    ///
    /// Never fails: a fetch failure ends the loop and is reported through
    /// [`CrawlOutcome::stop`] next to whatever was gathered before it.
    pub async fn crawl(&self, base_url: &str) -> CrawlOutcome {
        let started = Instant::now();
        let mut index = RemoteIndex::new();
        let mut pages_fetched = 0;
        let mut page: u32 = 1;

        let stop = loop {
            if page > self.options.max_pages {
                warn!(max_pages = self.options.max_pages, "page limit reached before end of results");
                break CrawlStop::PageLimit;
            }
            if self.options.deadline.is_some_and(|deadline| started.elapsed() >= deadline) {
                warn!(page, "crawl deadline exceeded");
                break CrawlStop::DeadlineExceeded;
            }

            let url = self.layout.listing_url(base_url, page);
            let fetched = match self.options.deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_sub(started.elapsed());
                    match tokio::time::timeout(remaining, self.fetcher.fetch(&url)).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(page, "crawl deadline exceeded");
                            break CrawlStop::DeadlineExceeded;
                        }
                    }
                }
                None => self.fetcher.fetch(&url).await,
            };

            let entries = match fetched {
                Ok(document) => parse_listing_page(&document, base_url, self.layout),
                Err(error) => {
                    warn!(page, %error, "listing page fetch failed, stopping crawl");
                    break CrawlStop::FetchFailed { page, error };
                }
            };

            let Some(entries) = entries else {
                info!(page, "reached past end of results");
                break CrawlStop::EndOfResults;
            };

            info!(page, listings = entries.len(), "fetched listing page");
            index.extend(entries);
            pages_fetched += 1;
            page += 1;

            if !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        };

        info!(pages_fetched, listings = index.len(), "crawl finished");
        CrawlOutcome {
            index,
            pages_fetched,
            stop,
        }
    }
}

/// Detail links on one listing page, or `None` when the page has no results grid.
///
/// Later anchors overwrite earlier ones with the same id.
pub fn parse_listing_page(document: &Html, base_url: &str, layout: &SiteLayout) -> Option<Vec<(u64, String)>> {
    let root = document.root_element();
    locate_signature(root, &layout.results_grid)?;

    let base = base_url.trim_end_matches('/');
    let entries = find_all(root, |node| {
        node.tag_name() == "a"
            && node
                .attribute("href")
                .is_some_and(|href| href.starts_with(&layout.detail_href_prefix))
    })
    .into_iter()
    .filter_map(|anchor| {
        let href = anchor.attribute("href")?;
        match extract_remote_id(href, &layout.detail_href_prefix) {
            Some(id) => Some((id, format!("{base}{href}"))),
            None => {
                debug!(%href, "no id in detail link");
                None
            }
        }
    })
    .collect();

    Some(entries)
}

/// Numeric id from a path shaped like `{prefix}{digits}/{slug}`
pub fn extract_remote_id(href: &str, prefix: &str) -> Option<u64> {
    let rest = href.strip_prefix(prefix)?;
    let digits = ID_AFTER_PREFIX.captures(rest)?.get(1)?;
    digits.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    const GRID: &str = "grid grid-cols-1 gap-4 md:grid-cols-2 lg:grid-cols-2 xl:grid-cols-3 xl:gap-8";

    fn page_with(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!(r#"<a href="{href}">car</a>"#))
            .collect();
        format!(r#"<html><body><div class="{GRID}">{anchors}</div></body></html>"#)
    }

    #[test]
    fn extracts_ids_from_detail_paths() {
        assert_eq!(extract_remote_id("/auto/10859/land-rover-2005", "/auto/"), Some(10859));
        assert_eq!(extract_remote_id("/auto/abc/slug", "/auto/"), None);
        assert_eq!(extract_remote_id("/auto/123", "/auto/"), None);
        assert_eq!(extract_remote_id("/blog/123/post", "/auto/"), None);
    }

    #[test]
    fn collects_detail_links_with_absolute_urls() {
        let doc = Html::parse_document(&page_with(&[
            "/auto/101/toyota-corolla",
            "/about",
            "/auto/102/mazda-demio",
        ]));
        let mut entries = parse_listing_page(&doc, "https://cars.example.com", &SiteLayout::default()).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                (101, "https://cars.example.com/auto/101/toyota-corolla".to_string()),
                (102, "https://cars.example.com/auto/102/mazda-demio".to_string()),
            ]
        );
    }

    #[test]
    fn repeated_id_keeps_last_link() {
        let doc = Html::parse_document(&page_with(&["/auto/7/old-slug", "/auto/7/new-slug"]));
        let index: RemoteIndex = parse_listing_page(&doc, "https://x.test", &SiteLayout::default())
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(index.get(&7).map(String::as_str), Some("https://x.test/auto/7/new-slug"));
    }

    #[test]
    fn page_without_grid_is_end_of_results() {
        let doc = Html::parse_document(r#"<html><body><a href="/auto/1/x">x</a></body></html>"#);
        assert!(parse_listing_page(&doc, "https://x.test", &SiteLayout::default()).is_none());
    }

    #[test]
    fn empty_grid_is_a_page_with_no_entries() {
        let doc = Html::parse_document(&page_with(&[]));
        assert_eq!(parse_listing_page(&doc, "https://x.test", &SiteLayout::default()), Some(vec![]));
    }

    /// Every page has results, so only a limit can end the crawl
    struct EndlessGrid {
        delay: Duration,
        requests: AtomicU32,
    }

    impl EndlessGrid {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                requests: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentFetcher for EndlessGrid {
        async fn fetch_markup(&self, _url: &str) -> Result<String, FetchError> {
            let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(page_with(&[format!("/auto/{n}/car").as_str()]))
        }
    }

    fn limits(deadline: Duration, page_delay: Duration) -> CrawlOptions {
        CrawlOptions {
            max_pages: 1000,
            deadline: Some(deadline),
            page_delay,
        }
    }

    #[tokio::test]
    async fn slow_pages_run_into_the_deadline() {
        let fetcher = EndlessGrid::new(Duration::from_millis(40));
        let layout = SiteLayout::default();
        let crawler = ListingCrawler::new(&fetcher, &layout, limits(Duration::from_millis(150), Duration::ZERO));

        let outcome = crawler.crawl("https://x.test").await;

        assert!(matches!(outcome.stop, CrawlStop::DeadlineExceeded));
        assert!(!outcome.is_complete());
        assert!(outcome.pages_fetched >= 1 && outcome.pages_fetched < 1000);
        assert_eq!(outcome.index.len(), outcome.pages_fetched as usize);
    }

    #[tokio::test]
    async fn spent_deadline_stops_before_the_first_request() {
        let fetcher = EndlessGrid::new(Duration::ZERO);
        let layout = SiteLayout::default();
        let crawler = ListingCrawler::new(&fetcher, &layout, limits(Duration::ZERO, Duration::ZERO));

        let outcome = crawler.crawl("https://x.test").await;

        assert!(matches!(outcome.stop, CrawlStop::DeadlineExceeded));
        assert_eq!(outcome.pages_fetched, 0);
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn page_delay_counts_against_the_deadline() {
        let fetcher = EndlessGrid::new(Duration::ZERO);
        let layout = SiteLayout::default();
        let crawler = ListingCrawler::new(
            &fetcher,
            &layout,
            limits(Duration::from_millis(50), Duration::from_millis(80)),
        );

        let outcome = crawler.crawl("https://x.test").await;

        assert!(matches!(outcome.stop, CrawlStop::DeadlineExceeded));
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(fetcher.requests.load(Ordering::SeqCst), 1);
    }
}
