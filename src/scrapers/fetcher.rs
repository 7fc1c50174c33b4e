use crate::error::FetchError;
use crate::scrapers::traits::DocumentFetcher;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP fetcher backed by a shared `reqwest` client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch_markup(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!(%url, "fetching");
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%url, %status, "non-success status");
            return Err(FetchError::NonSuccessStatus {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await?;
        debug!(%url, bytes = bytes.len(), "downloaded");

        let markup = String::from_utf8(bytes.to_vec())
            .map_err(|e| FetchError::Parse(format!("body of {url} is not UTF-8: {e}")))?;
        if markup.trim().is_empty() {
            return Err(FetchError::Parse(format!("empty body from {url}")));
        }

        Ok(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request on a local port with `status` and `body`
    async fn serve_once(status: &str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/auction?page=1")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn relative_urls_are_rejected_before_any_request() {
        let err = fetcher().fetch_markup("/auction?page=1").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn ok_response_returns_the_markup() {
        let url = serve_once("200 OK", b"<html><body>cars</body></html>").await;
        let markup = fetcher().fetch_markup(&url).await.unwrap();
        assert_eq!(markup, "<html><body>cars</body></html>");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_its_code() {
        let url = serve_once("503 Service Unavailable", b"busy").await;
        match fetcher().fetch_markup(&url).await {
            Err(FetchError::NonSuccessStatus { status, url: failed }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(failed, url);
            }
            other => panic!("expected NonSuccessStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_is_a_status_error() {
        let url = serve_once("404 Not Found", b"<html></html>").await;
        let err = fetcher().fetch_markup(&url).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::NonSuccessStatus { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn empty_body_is_a_parse_error() {
        let url = serve_once("200 OK", b"  \n ").await;
        let err = fetcher().fetch_markup(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn non_utf8_body_is_a_parse_error() {
        let url = serve_once("200 OK", b"<html>\xff\xfe</html>").await;
        let err = fetcher().fetch_markup(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
