use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Remote listing id → absolute detail page URL, as observed in one crawl.
pub type RemoteIndex = HashMap<u64, String>;

/// A single vehicle listing, either freshly extracted or loaded from a store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    /// Id used by the remote site in its detail URLs
    pub remote_id: u64,
    /// Handle assigned by the store on insert
    pub persisted_id: Option<i64>,
    pub make: String,
    pub model: String,
    pub year: u64,
    pub body_type: String,
    pub transmission: String,
    pub fuel_type: String,
    pub engine_capacity: f64,
    pub mileage: u64,
    pub plate: String,
    /// `None` when the detail page had no pricing section
    pub price: Option<u64>,
    pub description: String,
    pub seen_count: u64,
    pub sold: bool,
    pub detail_url: String,
    pub scraped_at: DateTime<Utc>,
}

impl ListingRecord {
    /// Empty record for `remote_id`, ready to be filled in by the detail extractor.
    pub fn new(remote_id: u64, detail_url: impl Into<String>) -> Self {
        Self {
            remote_id,
            persisted_id: None,
            make: String::new(),
            model: String::new(),
            year: 0,
            body_type: String::new(),
            transmission: String::new(),
            fuel_type: String::new(),
            engine_capacity: 0.0,
            mileage: 0,
            plate: String::new(),
            price: None,
            description: String::new(),
            seen_count: 1,
            sold: false,
            detail_url: detail_url.into(),
            scraped_at: Utc::now(),
        }
    }
}
