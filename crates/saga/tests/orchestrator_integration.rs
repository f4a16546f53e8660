//! Integration tests for the saga orchestrator.

use saga::{
    InMemoryMessageQueue, InMemoryObjectStore, InMemoryRecordStore, NullObserver,
    RecordingObserver, SagaOrchestrator, SagaState, SagaStatus, StateObserver, StepDelays,
    StepStatus, step_definitions,
};

const CSV: &str = "id,name,image_id\n1,Alice,img.jpg";

struct TestHarness {
    storage: InMemoryObjectStore,
    queue: InMemoryMessageQueue,
    records: InMemoryRecordStore,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            storage: InMemoryObjectStore::new(),
            queue: InMemoryMessageQueue::new(),
            records: InMemoryRecordStore::new(),
        }
    }

    fn orchestrator<O: StateObserver>(
        &self,
        file_name: &str,
        observer: O,
    ) -> SagaOrchestrator<InMemoryObjectStore, InMemoryMessageQueue, InMemoryRecordStore, O> {
        SagaOrchestrator::new(
            file_name,
            CSV.len() as u64,
            self.storage.clone(),
            self.queue.clone(),
            self.records.clone(),
            observer,
        )
        .with_delays(StepDelays::none())
    }
}

fn step_statuses(state: &SagaState) -> Vec<StepStatus> {
    state.steps.iter().map(|s| s.status).collect()
}

#[tokio::test]
async fn test_happy_path_all_steps_complete() {
    let h = TestHarness::new();
    let mut orchestrator = h.orchestrator("subjects.csv", NullObserver);

    let state = orchestrator.execute(CSV).await;

    assert_eq!(state.status, SagaStatus::Completed);
    assert_eq!(state.current_step, Some(4));
    assert_eq!(state.processed_rows, Some(1));
    assert!(state.error.is_none());
    assert!(
        state
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed)
    );
    assert!(state.completed_at.unwrap() >= state.started_at.unwrap());

    // Side effects landed in every store.
    assert_eq!(h.storage.object_count(), 1);
    assert!(h.storage.contains(&state.storage_key()));
    assert_eq!(h.queue.message_count(), 1);
    assert_eq!(h.queue.messages()[0].saga_id, state.saga_id);
    assert_eq!(h.records.record_count(), 1);
    assert_eq!(h.records.records()[0].name, "Alice");
}

#[tokio::test]
async fn test_injected_failure_at_compute_rolls_back_storage_only() {
    let h = TestHarness::new();
    let mut orchestrator = h.orchestrator("subjects.csv", NullObserver);

    let state = orchestrator.execute_with_failure(CSV, 2).await;

    assert_eq!(state.status, SagaStatus::Failed);
    assert_eq!(state.steps[2].status, StepStatus::Failed);
    let error = state.error.as_deref().unwrap();
    assert!(error.contains("Parse CSV Records"));
    assert_eq!(state.steps[2].error.as_deref(), Some(error));

    // Step 1 has no compensation and stays completed; step 0 was undone.
    assert_eq!(state.steps[1].status, StepStatus::Completed);
    assert_eq!(state.steps[0].status, StepStatus::Pending);

    // Steps beyond the failure were never touched.
    assert_eq!(state.steps[3].status, StepStatus::Pending);
    assert!(state.steps[3].started_at.is_none());
    assert_eq!(state.steps[4].status, StepStatus::Pending);

    // The stored object was deleted; the enqueued message is irreversible.
    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.queue.message_count(), 1);
    assert_eq!(h.records.record_count(), 0);
}

#[tokio::test]
async fn test_injected_failure_at_first_step_reverts_nothing() {
    let h = TestHarness::new();
    let mut orchestrator = h.orchestrator("subjects.csv", NullObserver);

    let state = orchestrator.execute_with_failure(CSV, 0).await;

    assert_eq!(state.status, SagaStatus::Failed);
    assert_eq!(state.steps[0].status, StepStatus::Failed);
    assert!(
        state.steps[1..]
            .iter()
            .all(|s| s.status == StepStatus::Pending)
    );

    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.queue.message_count(), 0);
    assert_eq!(h.records.record_count(), 0);
}

#[tokio::test]
async fn test_fail_at_every_index_honors_compensation_rules() {
    for fail_at in 0..step_definitions().len() {
        let h = TestHarness::new();
        let mut orchestrator = h.orchestrator("subjects.csv", NullObserver);

        let state = orchestrator.execute_with_failure(CSV, fail_at).await;

        assert_eq!(state.status, SagaStatus::Failed, "fail_at={fail_at}");
        assert_eq!(state.steps[fail_at].status, StepStatus::Failed);
        assert!(!state.steps[fail_at].error.as_deref().unwrap().is_empty());

        for (index, def) in step_definitions().iter().enumerate() {
            if index < fail_at {
                let expected = if def.compensable {
                    StepStatus::Pending
                } else {
                    StepStatus::Completed
                };
                assert_eq!(
                    state.steps[index].status, expected,
                    "fail_at={fail_at} index={index}"
                );
            } else if index > fail_at {
                assert_eq!(
                    state.steps[index].status,
                    StepStatus::Pending,
                    "fail_at={fail_at} index={index}"
                );
                assert!(state.steps[index].started_at.is_none());
            }
        }
    }
}

#[tokio::test]
async fn test_compensation_runs_in_descending_index_order() {
    let h = TestHarness::new();
    let observer = RecordingObserver::new();
    let mut orchestrator = h.orchestrator("subjects.csv", observer.clone());

    orchestrator.execute_with_failure(CSV, 4).await;

    // Replay the snapshot stream and collect the order in which steps
    // entered Processing while the saga was compensating.
    let snapshots = observer.snapshots();
    let mut compensated = Vec::new();
    for pair in snapshots.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.status != SagaStatus::Compensating {
            continue;
        }
        for index in 0..next.steps.len() {
            if next.steps[index].status == StepStatus::Processing
                && prev.steps[index].status != StepStatus::Processing
            {
                compensated.push(index);
            }
        }
    }

    assert_eq!(compensated, vec![3, 2, 0]);
}

#[tokio::test]
async fn test_injected_and_real_failures_are_equivalent() {
    // Real failure: the record database rejects the append at step 3.
    let real = TestHarness::new();
    real.records.set_fail_on_append(true);
    let mut orchestrator = real.orchestrator("subjects.csv", NullObserver);
    let real_state = orchestrator.execute(CSV).await;

    // Injected failure at the same step.
    let injected = TestHarness::new();
    let mut orchestrator = injected.orchestrator("subjects.csv", NullObserver);
    let injected_state = orchestrator.execute_with_failure(CSV, 3).await;

    assert_eq!(real_state.status, injected_state.status);
    assert_eq!(step_statuses(&real_state), step_statuses(&injected_state));
    assert_eq!(real_state.current_step, injected_state.current_step);

    // Only the error text differs.
    assert_ne!(real_state.error, injected_state.error);
    assert!(
        injected_state
            .error
            .as_deref()
            .unwrap()
            .starts_with("Simulated failure at")
    );

    // Both runs rolled storage back and left the irreversible message.
    assert_eq!(real.storage.object_count(), 0);
    assert_eq!(injected.storage.object_count(), 0);
    assert_eq!(real.queue.message_count(), 1);
    assert_eq!(injected.queue.message_count(), 1);
}

#[tokio::test]
async fn test_compensation_error_does_not_stop_rollback() {
    let h = TestHarness::new();
    h.records.set_fail_on_remove(true);
    let mut orchestrator = h.orchestrator("subjects.csv", NullObserver);

    let state = orchestrator.execute_with_failure(CSV, 4).await;

    assert_eq!(state.status, SagaStatus::Failed);
    // The database undo failed and its step never made it back to pending.
    assert_eq!(state.steps[3].status, StepStatus::Processing);
    assert_eq!(h.records.record_count(), 1);
    // Lower-index compensations still ran.
    assert_eq!(state.steps[2].status, StepStatus::Pending);
    assert_eq!(state.steps[0].status, StepStatus::Pending);
    assert_eq!(h.storage.object_count(), 0);
}

#[tokio::test]
async fn test_concurrent_sagas_with_same_file_name_do_not_collide() {
    let h = TestHarness::new();

    let csv_a = "id,name,image_id\n1,Alice,img_1.jpg";
    let csv_b = "id,name,image_id\n2,Bob,img_2.jpg\n3,Carol,img_3.jpg";

    let mut saga_a = h.orchestrator("subjects.csv", NullObserver);
    let mut saga_b = h.orchestrator("subjects.csv", NullObserver);

    let (state_a, state_b) = tokio::join!(saga_a.execute(csv_a), saga_b.execute(csv_b));

    assert_eq!(state_a.status, SagaStatus::Completed);
    assert_eq!(state_b.status, SagaStatus::Completed);
    assert_eq!(state_a.processed_rows, Some(1));
    assert_eq!(state_b.processed_rows, Some(2));

    // Distinct storage keys; neither saga overwrote the other's content.
    assert_ne!(state_a.storage_key(), state_b.storage_key());
    assert_eq!(h.storage.object_count(), 2);
    assert!(h.storage.contains(&state_a.storage_key()));
    assert!(h.storage.contains(&state_b.storage_key()));
    assert_eq!(h.queue.message_count(), 2);
    assert_eq!(h.records.record_count(), 3);
}

#[tokio::test]
async fn test_observer_snapshots_are_monotonic() {
    let h = TestHarness::new();
    let observer = RecordingObserver::new();
    let mut orchestrator = h.orchestrator("subjects.csv", observer.clone());

    let final_state = orchestrator.execute(CSV).await;

    let snapshots = observer.snapshots();
    assert_eq!(snapshots.last().unwrap(), &final_state);

    // current_step never moves backwards and completed step counts never
    // shrink on the forward-only happy path.
    for pair in snapshots.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(next.current_step >= prev.current_step);

        let completed = |s: &SagaState| {
            s.steps
                .iter()
                .filter(|step| step.status == StepStatus::Completed)
                .count()
        };
        assert!(completed(next) >= completed(prev));
    }
}

#[tokio::test]
async fn test_stores_persist_across_runs_until_cleared() {
    let h = TestHarness::new();

    let mut first = h.orchestrator("subjects.csv", NullObserver);
    first.execute(CSV).await;
    let mut second = h.orchestrator("subjects.csv", NullObserver);
    second.execute(CSV).await;

    assert_eq!(h.storage.object_count(), 2);
    assert_eq!(h.queue.message_count(), 2);
    assert_eq!(h.records.record_count(), 2);

    h.storage.clear();
    h.queue.clear();
    h.records.clear();
    assert_eq!(h.storage.object_count(), 0);
    assert_eq!(h.queue.message_count(), 0);
    assert_eq!(h.records.record_count(), 0);
}
