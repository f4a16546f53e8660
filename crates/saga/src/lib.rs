//! Saga pattern implementation for the CSV ingest pipeline.
//!
//! This crate provides a saga orchestrator that runs an ordered sequence of
//! remote-operation steps against simulated external services and, on failure
//! of any step, rolls back the already-completed steps in reverse order.
//!
//! The ingest pipeline follows these steps:
//! 1. Upload the raw CSV to object storage
//! 2. Enqueue a processing message
//! 3. Parse the stored CSV into subject records
//! 4. Write the records to the database
//! 5. Notify an external webhook
//!
//! If any step fails, previously completed steps are compensated in reverse
//! order; compensation is best-effort and never aborts early.

pub mod error;
pub mod handlers;
pub mod observer;
pub mod orchestrator;
pub mod pipeline;
pub mod state;
pub mod status;
pub mod stores;

pub use error::SagaError;
pub use observer::{ChannelObserver, NullObserver, RecordingObserver, StateObserver};
pub use orchestrator::SagaOrchestrator;
pub use pipeline::{STEP_COUNT, StepDefinition, StepDelays, StepKind, step_definitions};
pub use state::{PipelineStep, SagaState, StepPayload};
pub use status::{SagaStatus, StepStatus};
pub use stores::{
    InMemoryMessageQueue, InMemoryObjectStore, InMemoryRecordStore, MessageQueue, ObjectStore,
    QueueMessage, RecordStore,
};
