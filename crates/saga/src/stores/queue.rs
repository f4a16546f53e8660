//! Message queue capability and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::SagaId;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// A processing message referencing a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub message_id: String,
    pub saga_id: SagaId,
    pub storage_key: String,
}

/// Trait for the work queue.
///
/// Enqueueing is irreversible; there is no dequeue or compensation
/// counterpart.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueues a processing message and returns its assigned message id.
    async fn enqueue(&self, saga_id: SagaId, storage_key: &str) -> Result<String, SagaError>;
}

#[derive(Debug, Default)]
struct InMemoryQueueState {
    messages: Vec<QueueMessage>,
    next_id: u32,
    fail_on_enqueue: bool,
}

/// In-memory message queue for testing and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageQueue {
    state: Arc<RwLock<InMemoryQueueState>>,
}

impl InMemoryMessageQueue {
    /// Creates a new empty in-memory queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the queue to fail on subsequent enqueue calls.
    pub fn set_fail_on_enqueue(&self, fail: bool) {
        self.state.write().unwrap().fail_on_enqueue = fail;
    }

    /// Returns the number of enqueued messages.
    pub fn message_count(&self) -> usize {
        self.state.read().unwrap().messages.len()
    }

    /// Returns a copy of all enqueued messages, oldest first.
    pub fn messages(&self) -> Vec<QueueMessage> {
        self.state.read().unwrap().messages.clone()
    }

    /// Removes all enqueued messages.
    pub fn clear(&self) {
        self.state.write().unwrap().messages.clear();
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn enqueue(&self, saga_id: SagaId, storage_key: &str) -> Result<String, SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_enqueue {
            return Err(SagaError::Queue("queue unavailable".to_string()));
        }

        state.next_id += 1;
        let message_id = format!("MSG-{:04}", state.next_id);
        state.messages.push(QueueMessage {
            message_id: message_id.clone(),
            saga_id,
            storage_key: storage_key.to_string(),
        });

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_records_message() {
        let queue = InMemoryMessageQueue::new();
        let saga_id = SagaId::new();

        let message_id = queue.enqueue(saga_id, "uploads/a/f.csv").await.unwrap();
        assert_eq!(message_id, "MSG-0001");
        assert_eq!(queue.message_count(), 1);

        let messages = queue.messages();
        assert_eq!(messages[0].saga_id, saga_id);
        assert_eq!(messages[0].storage_key, "uploads/a/f.csv");
    }

    #[tokio::test]
    async fn test_sequential_message_ids() {
        let queue = InMemoryMessageQueue::new();
        let saga_id = SagaId::new();

        let m1 = queue.enqueue(saga_id, "k1").await.unwrap();
        let m2 = queue.enqueue(saga_id, "k2").await.unwrap();
        assert_eq!(m1, "MSG-0001");
        assert_eq!(m2, "MSG-0002");
    }

    #[tokio::test]
    async fn test_fail_on_enqueue() {
        let queue = InMemoryMessageQueue::new();
        queue.set_fail_on_enqueue(true);

        let result = queue.enqueue(SagaId::new(), "k").await;
        assert!(matches!(result, Err(SagaError::Queue(_))));
        assert_eq!(queue.message_count(), 0);
    }
}
