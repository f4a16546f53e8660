//! Simulated resource-store capabilities and in-memory implementations.
//!
//! The stores are process-wide and outlive any single saga; they are never
//! reset except through the explicit test-support `clear` operations.

pub mod object_store;
pub mod queue;
pub mod records;

pub use object_store::{InMemoryObjectStore, ObjectStore};
pub use queue::{InMemoryMessageQueue, MessageQueue, QueueMessage};
pub use records::{InMemoryRecordStore, RecordStore};
