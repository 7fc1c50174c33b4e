//! Diff of locally active listings against a freshly crawled remote index.

use crate::models::{ListingRecord, RemoteIndex};

/// Classification of one reconciliation pass.
///
/// `to_mark_sold` and `to_increment_seen` partition the active records;
/// `new_ids` is what is left of the remote index afterwards.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Active records whose id no longer appears remotely
    pub to_mark_sold: Vec<ListingRecord>,
    /// Active records still listed remotely
    pub to_increment_seen: Vec<ListingRecord>,
    /// Remote ids with no active record, with their detail URLs
    pub new_ids: RemoteIndex,
}

/// Classify every active record as sold or seen, leaving the unknown remote ids as new.
///
/// Single pass over `active`; the remote index is consumed as the working copy.
pub fn reconcile(active: Vec<ListingRecord>, mut remote: RemoteIndex) -> Reconciliation {
    let mut result = Reconciliation::default();

    for record in active {
        if remote.remove(&record.remote_id).is_some() {
            result.to_increment_seen.push(record);
        } else {
            result.to_mark_sold.push(record);
        }
    }

    result.new_ids = remote;
    result
}
