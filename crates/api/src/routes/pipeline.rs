//! Pipeline execution endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use saga::{ChannelObserver, STEP_COUNT, SagaOrchestrator, SagaState};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RunPipelineRequest {
    pub file_name: String,
    pub csv_content: String,
    /// When set, the step at this index fails deterministically instead of
    /// running its real handler.
    pub fail_at_step: Option<usize>,
}

/// POST /pipeline/run — runs a saga over the supplied CSV and returns its
/// terminal state.
#[tracing::instrument(skip(state, req), fields(file_name = %req.file_name))]
pub async fn run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunPipelineRequest>,
) -> Result<Json<SagaState>, ApiError> {
    if let Some(fail_at) = req.fail_at_step
        && fail_at >= STEP_COUNT
    {
        return Err(ApiError::BadRequest(format!(
            "fail_at_step must be below {STEP_COUNT}"
        )));
    }

    // Snapshots are drained off the orchestration path; a UI would subscribe
    // here instead.
    let (observer, mut rx) = ChannelObserver::new();
    tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            tracing::debug!(
                saga_id = %snapshot.saga_id,
                status = %snapshot.status,
                current_step = ?snapshot.current_step,
                "pipeline state changed"
            );
        }
    });

    let mut orchestrator = SagaOrchestrator::new(
        req.file_name,
        req.csv_content.len() as u64,
        state.storage.clone(),
        state.queue.clone(),
        state.records.clone(),
        observer,
    )
    .with_delays(state.delays.clone());

    let final_state = match req.fail_at_step {
        Some(fail_at) => {
            orchestrator
                .execute_with_failure(&req.csv_content, fail_at)
                .await
        }
        None => orchestrator.execute(&req.csv_content).await,
    };

    Ok(Json(final_state))
}
