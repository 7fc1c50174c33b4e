use crate::error::FetchError;
use async_trait::async_trait;
use scraper::Html;

/// Source of page markup.
/// The crawler and pipeline only talk to this, so tests can serve canned pages.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// GET `url` and return its body. No retries at this layer.
    async fn fetch_markup(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch `url` and parse it into a document tree
    async fn fetch(&self, url: &str) -> Result<Html, FetchError> {
        let markup = self.fetch_markup(url).await?;
        Ok(Html::parse_document(&markup))
    }
}
