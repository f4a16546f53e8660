//! Saga orchestrator driving forward execution and reverse-order rollback.

use std::time::Instant;

use chrono::Utc;
use tokio::time::sleep;

use crate::error::SagaError;
use crate::handlers::StepHandlers;
use crate::observer::StateObserver;
use crate::pipeline::{STEP_COUNT, StepDelays, step_definitions};
use crate::state::{SagaState, StepPayload};
use crate::status::{SagaStatus, StepStatus};
use crate::stores::{MessageQueue, ObjectStore, RecordStore};

/// Orchestrates one saga run over the five-stage ingest pipeline.
///
/// The orchestrator executes the steps strictly sequentially, feeding each
/// step's result into the next. On any handler failure it compensates the
/// already-completed steps in reverse order, best-effort, then marks the
/// saga failed. Every state mutation is followed by a synchronous
/// notification of the observer with a full snapshot.
///
/// A fresh orchestrator is created per run; the resource stores it holds are
/// process-wide and shared across runs.
pub struct SagaOrchestrator<S, Q, R, O>
where
    S: ObjectStore,
    Q: MessageQueue,
    R: RecordStore,
    O: StateObserver,
{
    state: SagaState,
    handlers: StepHandlers<S, Q, R>,
    observer: O,
}

impl<S, Q, R, O> SagaOrchestrator<S, Q, R, O>
where
    S: ObjectStore,
    Q: MessageQueue,
    R: RecordStore,
    O: StateObserver,
{
    /// Creates a new orchestrator with a fresh `Idle` state.
    ///
    /// Construction has no side effects: the stores are untouched and the
    /// observer is not notified until execution starts.
    pub fn new(
        file_name: impl Into<String>,
        file_size: u64,
        storage: S,
        queue: Q,
        records: R,
        observer: O,
    ) -> Self {
        Self {
            state: SagaState::new(file_name, file_size),
            handlers: StepHandlers::new(storage, queue, records, StepDelays::default()),
            observer,
        }
    }

    /// Replaces the simulated latency table, e.g. with [`StepDelays::none`]
    /// in tests.
    pub fn with_delays(mut self, delays: StepDelays) -> Self {
        self.handlers.set_delays(delays);
        self
    }

    /// Returns the current state snapshot. Callers must treat it as
    /// read-only.
    pub fn state(&self) -> &SagaState {
        &self.state
    }

    /// Runs all five steps forward in order, compensating on failure.
    ///
    /// Returns the terminal state; the same snapshot was also delivered to
    /// the observer as the final notification.
    #[tracing::instrument(skip(self, csv_content), fields(saga_id = %self.state.saga_id))]
    pub async fn execute(&mut self, csv_content: &str) -> SagaState {
        self.run(csv_content, None).await
    }

    /// Identical to [`execute`](Self::execute), except the step at
    /// `fail_at_step` is replaced by a deterministic synthesized failure.
    ///
    /// All steps before `fail_at_step` run their real handlers; the failing
    /// step waits the injected-failure delay and then follows exactly the
    /// same failure path as a genuine handler error.
    #[tracing::instrument(skip(self, csv_content), fields(saga_id = %self.state.saga_id))]
    pub async fn execute_with_failure(
        &mut self,
        csv_content: &str,
        fail_at_step: usize,
    ) -> SagaState {
        self.run(csv_content, Some(fail_at_step)).await
    }

    async fn run(&mut self, csv_content: &str, fail_at: Option<usize>) -> SagaState {
        metrics::counter!("saga_executions_total").increment(1);
        let run_start = Instant::now();

        self.mutate(|state| {
            state.status = SagaStatus::Running;
            state.started_at = Some(Utc::now());
            state.current_step = Some(0);
        });

        let mut data = StepPayload::Csv(csv_content.to_string());

        for index in 0..STEP_COUNT {
            let def = &step_definitions()[index];
            self.mutate(|state| state.current_step = Some(index));
            self.mutate(|state| {
                let step = &mut state.steps[index];
                step.status = StepStatus::Processing;
                step.started_at = Some(Utc::now());
            });

            if fail_at == Some(index) {
                sleep(self.handlers.delays().injected_failure).await;
                let error = SagaError::Injected {
                    step: def.name.to_string(),
                };
                return self.fail(index, error, run_start).await;
            }

            match self.handlers.run(def.kind, &self.state, data).await {
                Ok(output) => {
                    if let StepPayload::Records(records) = &output {
                        let count = records.len();
                        self.mutate(|state| state.processed_rows = Some(count));
                    }
                    self.mutate(|state| {
                        let step = &mut state.steps[index];
                        step.status = StepStatus::Completed;
                        step.completed_at = Some(Utc::now());
                        step.result = Some(output.clone());
                    });
                    data = output;
                }
                Err(error) => return self.fail(index, error, run_start).await,
            }
        }

        self.mutate(|state| {
            state.status = SagaStatus::Completed;
            state.completed_at = Some(Utc::now());
        });

        let duration = run_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        metrics::counter!("saga_completed").increment(1);
        tracing::info!(duration, "saga completed");

        self.state.clone()
    }

    /// Marks step `index` failed, rolls back everything below it, and
    /// settles the saga as failed.
    async fn fail(&mut self, index: usize, error: SagaError, run_start: Instant) -> SagaState {
        let message = error.to_string();
        self.mutate(|state| {
            let step = &mut state.steps[index];
            step.status = StepStatus::Failed;
            step.completed_at = Some(Utc::now());
            step.error = Some(message.clone());
        });
        tracing::warn!(step = step_definitions()[index].id, error = %message, "step failed");

        self.compensate(index).await;

        self.mutate(|state| {
            state.status = SagaStatus::Failed;
            state.completed_at = Some(Utc::now());
            state.error = Some(message.clone());
        });

        metrics::histogram!("saga_duration_seconds").record(run_start.elapsed().as_secs_f64());
        metrics::counter!("saga_failed").increment(1);

        self.state.clone()
    }

    /// Runs compensating handlers for every step below `failed_index`, in
    /// strictly descending order. Steps without a compensating handler are
    /// skipped silently. Rollback is best-effort: a failing undo is logged
    /// and unwinding continues to the next lower index.
    async fn compensate(&mut self, failed_index: usize) {
        self.mutate(|state| state.status = SagaStatus::Compensating);

        for index in (0..failed_index).rev() {
            let def = &step_definitions()[index];
            if !def.compensable {
                continue;
            }

            self.mutate(|state| state.steps[index].status = StepStatus::Processing);

            match self.handlers.compensate(def.kind, &self.state).await {
                Ok(()) => {
                    self.mutate(|state| state.steps[index].status = StepStatus::Pending);
                }
                Err(error) => {
                    let error = SagaError::CompensationFailed {
                        step: def.id.to_string(),
                        reason: error.to_string(),
                    };
                    tracing::error!(step = def.id, error = %error, "compensation failed; continuing rollback");
                }
            }
        }
    }

    fn mutate<F: FnOnce(&mut SagaState)>(&mut self, f: F) {
        f(&mut self.state);
        self.observer.state_changed(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use crate::stores::{InMemoryMessageQueue, InMemoryObjectStore, InMemoryRecordStore};

    const CSV: &str = "id,name,image_id\n1,Alice,img.jpg";

    type TestOrchestrator = SagaOrchestrator<
        InMemoryObjectStore,
        InMemoryMessageQueue,
        InMemoryRecordStore,
        RecordingObserver,
    >;

    fn setup() -> (TestOrchestrator, RecordingObserver) {
        let observer = RecordingObserver::new();
        let orchestrator = SagaOrchestrator::new(
            "subjects.csv",
            CSV.len() as u64,
            InMemoryObjectStore::new(),
            InMemoryMessageQueue::new(),
            InMemoryRecordStore::new(),
            observer.clone(),
        )
        .with_delays(StepDelays::none());
        (orchestrator, observer)
    }

    #[test]
    fn test_construction_has_no_side_effects() {
        let (orchestrator, observer) = setup();
        assert_eq!(orchestrator.state().status, SagaStatus::Idle);
        assert!(observer.is_empty());
    }

    #[tokio::test]
    async fn test_state_does_not_mutate_between_calls() {
        let (mut orchestrator, _) = setup();
        orchestrator.execute(CSV).await;

        let first = orchestrator.state().clone();
        let second = orchestrator.state().clone();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_observer_sees_idle_never_and_terminal_last() {
        let (mut orchestrator, observer) = setup();
        let final_state = orchestrator.execute(CSV).await;

        let snapshots = observer.snapshots();
        assert!(snapshots.iter().all(|s| s.status != SagaStatus::Idle));
        assert_eq!(snapshots.last().unwrap(), &final_state);
        assert_eq!(snapshots.first().unwrap().status, SagaStatus::Running);
    }

    #[tokio::test]
    async fn test_failure_at_first_step_runs_empty_compensation() {
        let (mut orchestrator, observer) = setup();
        let state = orchestrator.execute_with_failure(CSV, 0).await;

        assert_eq!(state.status, SagaStatus::Failed);
        assert_eq!(state.steps[0].status, StepStatus::Failed);
        assert!(
            state.steps[1..]
                .iter()
                .all(|s| s.status == StepStatus::Pending)
        );
        // The compensation loop still announces itself even with nothing to
        // undo.
        assert!(
            observer
                .snapshots()
                .iter()
                .any(|s| s.status == SagaStatus::Compensating)
        );
    }
}
