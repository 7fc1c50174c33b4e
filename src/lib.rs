//! Crawl a paginated car auction site and keep a local dataset in step with it.
//!
//! Each run loads the active listings from a [`store::ListingStore`], crawls
//! the remote listing pages into a remote index, marks vanished listings sold,
//! bumps the seen counter of listings still present, and fetches and stores
//! the ones it has not seen before.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod scrapers;
pub mod store;
