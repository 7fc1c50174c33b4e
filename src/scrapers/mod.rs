pub mod detail;
pub mod fetcher;
pub mod listing;
pub mod locator;
pub mod traits;
pub mod types;

pub use detail::DetailExtractor;
pub use fetcher::HttpFetcher;
pub use listing::{CrawlOptions, CrawlOutcome, CrawlStop, ListingCrawler};
pub use traits::DocumentFetcher;
pub use types::{NodeSignature, SiteLayout};
