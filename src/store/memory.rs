use crate::error::StoreError;
use crate::models::ListingRecord;
use crate::store::ListingStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, ListingRecord>,
}

/// Store kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryListingStore {
    state: Mutex<State>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously persisted records.
    /// Records without a persisted id are numbered after the highest seeded id.
    pub fn from_records(records: Vec<ListingRecord>) -> Self {
        let mut state = State::default();
        let (seeded, unnumbered): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.persisted_id.is_some());

        for record in seeded {
            if let Some(id) = record.persisted_id {
                state.next_id = state.next_id.max(id);
                state.rows.insert(id, record);
            }
        }
        for mut record in unnumbered {
            state.next_id += 1;
            record.persisted_id = Some(state.next_id);
            state.rows.insert(state.next_id, record);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Every stored record, sold ones included, ordered by persisted id
    pub fn snapshot(&self) -> Vec<ListingRecord> {
        self.lock().rows.values().cloned().collect()
    }

    pub fn get_by_remote_id(&self, remote_id: u64) -> Option<ListingRecord> {
        self.lock().rows.values().find(|r| r.remote_id == remote_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F>(&self, persisted_id: i64, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ListingRecord),
    {
        let mut state = self.lock();
        let record = state
            .rows
            .get_mut(&persisted_id)
            .ok_or(StoreError::NotFound(persisted_id))?;
        apply(record);
        Ok(())
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError> {
        Ok(self.lock().rows.values().filter(|r| !r.sold).cloned().collect())
    }

    async fn insert(&self, record: &ListingRecord) -> Result<i64, StoreError> {
        let mut state = self.lock();
        if state.rows.values().any(|r| r.remote_id == record.remote_id) {
            return Err(StoreError::DuplicateKey(record.remote_id));
        }

        state.next_id += 1;
        let id = state.next_id;
        let mut stored = record.clone();
        stored.persisted_id = Some(id);
        stored.seen_count = 1;
        stored.sold = false;
        state.rows.insert(id, stored);
        Ok(id)
    }

    async fn mark_sold(&self, persisted_id: i64) -> Result<(), StoreError> {
        self.update(persisted_id, |record| record.sold = true)
    }

    async fn increment_seen(&self, persisted_id: i64) -> Result<(), StoreError> {
        self.update(persisted_id, |record| record.seen_count += 1)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
