//! Object storage capability and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::SagaError;

/// Trait for keyed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<(), SagaError>;

    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, SagaError>;

    /// Deletes the value stored under `key`. Deleting an absent key is a
    /// no-op.
    async fn delete(&self, key: &str) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryObjectState {
    objects: HashMap<String, String>,
    fail_on_put: bool,
    fail_on_delete: bool,
}

/// In-memory object store for testing and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    state: Arc<RwLock<InMemoryObjectState>>,
}

impl InMemoryObjectStore {
    /// Creates a new empty in-memory object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail on subsequent put calls.
    pub fn set_fail_on_put(&self, fail: bool) {
        self.state.write().unwrap().fail_on_put = fail;
    }

    /// Configures the store to fail on subsequent delete calls.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().unwrap().fail_on_delete = fail;
    }

    /// Returns the number of stored objects.
    pub fn object_count(&self) -> usize {
        self.state.read().unwrap().objects.len()
    }

    /// Returns true if an object exists under the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.state.read().unwrap().objects.contains_key(key)
    }

    /// Removes all stored objects.
    pub fn clear(&self) {
        self.state.write().unwrap().objects.clear();
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, value: String) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_put {
            return Err(SagaError::ObjectStore("storage unavailable".to_string()));
        }

        state.objects.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SagaError> {
        let state = self.state.read().unwrap();
        Ok(state.objects.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_delete {
            return Err(SagaError::ObjectStore("storage unavailable".to_string()));
        }

        state.objects.remove(key);
        Ok(())
    }
}
