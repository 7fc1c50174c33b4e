//! Persistence of listing records.
//!
//! The pipeline only sees [`ListingStore`]; which backend sits behind it is
//! decided once at startup.

pub mod json_file;
pub mod memory;
pub mod postgres;

pub use json_file::JsonFileStore;
pub use memory::MemoryListingStore;
pub use postgres::PgListingStore;

use crate::error::StoreError;
use crate::models::ListingRecord;
use async_trait::async_trait;

/// Read and write access to persisted listings.
///
/// `remote_id` is unique across every stored record, sold or not.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Create tables or files the store needs. Called once before a run.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Every record with `sold = false`
    async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError>;

    /// Store a new record with `seen_count = 1` and return its persisted id.
    /// Fails with [`StoreError::DuplicateKey`] if the remote id is taken.
    async fn insert(&self, record: &ListingRecord) -> Result<i64, StoreError>;

    /// Flag the record as sold. Marking an already sold record is a no-op.
    async fn mark_sold(&self, persisted_id: i64) -> Result<(), StoreError>;

    async fn increment_seen(&self, persisted_id: i64) -> Result<(), StoreError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
