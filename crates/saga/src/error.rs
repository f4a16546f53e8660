//! Saga error types.

use thiserror::Error;

/// Errors that can occur during saga execution.
///
/// Forward-path errors always end the saga and trigger compensation.
/// [`SagaError::CompensationFailed`] is only ever logged inside the rollback
/// loop; it never changes the outcome of the enclosing saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Object storage error.
    #[error("object storage error: {0}")]
    ObjectStore(String),

    /// Message queue error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Record database error.
    #[error("record store error: {0}")]
    RecordStore(String),

    /// The compute stage's required upstream artifact is absent.
    #[error("CSV content not found in object storage: {key}")]
    MissingDependency { key: String },

    /// A step received a payload of the wrong kind from its predecessor.
    #[error("step '{step}' received unexpected input payload")]
    UnexpectedPayload { step: String },

    /// Deterministic failure synthesized by the failure-injection entry point.
    #[error("Simulated failure at {step}")]
    Injected { step: String },

    /// A compensating handler failed during rollback.
    #[error("compensation for step '{step}' failed: {reason}")]
    CompensationFailed { step: String, reason: String },
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
