//! Record database capability and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Subject;

use crate::error::SagaError;

/// Trait for the record database.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Appends records to the end of the store.
    async fn append(&self, records: Vec<Subject>) -> Result<(), SagaError>;

    /// Removes the trailing `n` records (fewer if the store is smaller).
    ///
    /// Rollback by trailing count assumes the saga's own appends are the most
    /// recent; sagas sharing this store must not interleave their
    /// write/rollback pairs, or one saga's rollback will remove another's
    /// records.
    async fn remove_last(&self, n: usize) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryRecordState {
    records: Vec<Subject>,
    fail_on_append: bool,
    fail_on_remove: bool,
}

/// In-memory record store for testing and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<InMemoryRecordState>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on subsequent append calls.
    pub fn set_fail_on_append(&self, fail: bool) {
        self.state.write().unwrap().fail_on_append = fail;
    }

    /// Configures the store to fail on subsequent remove_last calls.
    pub fn set_fail_on_remove(&self, fail: bool) {
        self.state.write().unwrap().fail_on_remove = fail;
    }

    /// Returns the number of stored records.
    pub fn record_count(&self) -> usize {
        self.state.read().unwrap().records.len()
    }

    /// Returns a copy of all stored records, in insertion order.
    pub fn records(&self) -> Vec<Subject> {
        self.state.read().unwrap().records.clone()
    }

    /// Removes all stored records.
    pub fn clear(&self) {
        self.state.write().unwrap().records.clear();
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn append(&self, records: Vec<Subject>) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_append {
            return Err(SagaError::RecordStore("database unavailable".to_string()));
        }

        state.records.extend(records);
        Ok(())
    }

    async fn remove_last(&self, n: usize) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_remove {
            return Err(SagaError::RecordStore("database unavailable".to_string()));
        }

        let len = state.records.len();
        state.records.truncate(len.saturating_sub(n));
        Ok(())
    }
}
