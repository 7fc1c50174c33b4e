//! Error types shared by the fetch, extract and store layers.
//!
//! "Node not found" is deliberately absent: locating a node returns
//! `Option`, and callers treat `None` as a signal rather than a failure.
//! Numeric conversion failures degrade to zero inside the extractor and
//! never surface here.

use reqwest::StatusCode;

/// Failure to turn a URL into a parsed document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL is not absolute.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with anything other than 200 OK.
    #[error("non-success status {status} from {url}")]
    NonSuccessStatus { url: String, status: StatusCode },

    /// The body could not be turned into a document.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Failure to extract a typed record from a detail page.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("expected {expected} bold labels, found {found}")]
    FieldCountMismatch { expected: usize, found: usize },
}

/// Failure reported by a [`crate::store::ListingStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a listing with remote id {0} already exists")]
    DuplicateKey(u64),

    #[error("no listing with persisted id {0}")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a single new listing could not be stored.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
