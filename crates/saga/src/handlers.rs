//! Forward and compensating handlers for the five pipeline stages.

use common::csv::parse_subject_rows;
use tokio::time::sleep;

use crate::error::SagaError;
use crate::pipeline::{StepDelays, StepKind};
use crate::state::{SagaState, StepPayload};
use crate::stores::{MessageQueue, ObjectStore, RecordStore};

/// Executes the per-stage effects against the injected resource stores.
///
/// Every forward handler simulates network latency before taking effect;
/// compensating handlers do the same with their own (shorter) delays.
pub struct StepHandlers<S, Q, R> {
    storage: S,
    queue: Q,
    records: R,
    delays: StepDelays,
}

impl<S, Q, R> StepHandlers<S, Q, R>
where
    S: ObjectStore,
    Q: MessageQueue,
    R: RecordStore,
{
    pub fn new(storage: S, queue: Q, records: R, delays: StepDelays) -> Self {
        Self {
            storage,
            queue,
            records,
            delays,
        }
    }

    pub fn delays(&self) -> &StepDelays {
        &self.delays
    }

    pub fn set_delays(&mut self, delays: StepDelays) {
        self.delays = delays;
    }

    /// Runs the forward handler for `kind`, chaining the upstream payload
    /// into this stage's output.
    pub async fn run(
        &self,
        kind: StepKind,
        state: &SagaState,
        input: StepPayload,
    ) -> Result<StepPayload, SagaError> {
        sleep(self.delays.forward(kind)).await;

        match kind {
            StepKind::StorageWrite => {
                let StepPayload::Csv(content) = input else {
                    return Err(unexpected(kind));
                };
                let key = state.storage_key();
                self.storage.put(&key, content).await?;
                Ok(StepPayload::StorageKey(key))
            }
            StepKind::QueueEnqueue => {
                let StepPayload::StorageKey(key) = input else {
                    return Err(unexpected(kind));
                };
                let message_id = self.queue.enqueue(state.saga_id, &key).await?;
                Ok(StepPayload::MessageId(message_id))
            }
            StepKind::ComputeParse => {
                // The worker ignores the message payload and re-reads the
                // stored object, so a missing upstream write surfaces here.
                let key = state.storage_key();
                let content = self
                    .storage
                    .get(&key)
                    .await?
                    .ok_or(SagaError::MissingDependency { key })?;
                Ok(StepPayload::Records(parse_subject_rows(&content)))
            }
            StepKind::DatabaseWrite => {
                let StepPayload::Records(records) = input else {
                    return Err(unexpected(kind));
                };
                let count = records.len();
                self.records.append(records).await?;
                Ok(StepPayload::RecordCount(count))
            }
            StepKind::WebhookNotify => {
                let StepPayload::RecordCount(count) = input else {
                    return Err(unexpected(kind));
                };
                tracing::info!(records = count, "webhook: processing complete");
                Ok(StepPayload::Notified)
            }
        }
    }

    /// Runs the compensating handler for `kind`.
    ///
    /// Only called for compensable stages; the queue and webhook stages have
    /// no undo.
    pub async fn compensate(&self, kind: StepKind, state: &SagaState) -> Result<(), SagaError> {
        sleep(self.delays.undo(kind)).await;

        match kind {
            StepKind::StorageWrite => self.storage.delete(&state.storage_key()).await,
            // Parsing produced no external effect; the undo exists only to
            // keep the rollback loop symmetric.
            StepKind::ComputeParse => Ok(()),
            StepKind::DatabaseWrite => {
                self.records
                    .remove_last(state.processed_rows.unwrap_or(0))
                    .await
            }
            StepKind::QueueEnqueue | StepKind::WebhookNotify => Ok(()),
        }
    }
}

fn unexpected(kind: StepKind) -> SagaError {
    SagaError::UnexpectedPayload {
        step: kind.id().to_string(),
    }
}
