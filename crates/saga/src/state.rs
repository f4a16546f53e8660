//! The per-run saga state record and its embedded pipeline steps.

use chrono::{DateTime, Utc};
use common::{SagaId, Subject};
use serde::{Deserialize, Serialize};

use crate::pipeline::{StepDefinition, step_definitions};
use crate::status::{SagaStatus, StepStatus};

/// Payload handed from one step to the next during forward execution.
///
/// Each stage produces the kind its successor expects; a mismatch is a
/// handler failure, not a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepPayload {
    /// Raw CSV text supplied by the caller.
    Csv(String),
    /// Key under which the CSV was stored.
    StorageKey(String),
    /// Id of the enqueued processing message.
    MessageId(String),
    /// Subject records parsed by the compute stage.
    Records(Vec<Subject>),
    /// Number of records appended to the database.
    RecordCount(usize),
    /// Webhook delivery confirmation.
    Notified,
}

/// One step of the pipeline, owned by and embedded in [`SagaState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StepPayload>,
}

impl PipelineStep {
    fn from_definition(def: &StepDefinition) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
            result: None,
        }
    }
}

/// The mutable record describing one saga run.
///
/// Created fresh per execution request, mutated in place throughout one
/// `execute` call, and handed to the caller as the return value. Observers
/// receive a full clone of this record after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaState {
    pub saga_id: SagaId,
    pub file_name: String,
    pub file_size: u64,
    pub status: SagaStatus,
    pub steps: Vec<PipelineStep>,
    /// Index of the step currently being processed; `None` before execution
    /// starts.
    pub current_step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set by the compute stage; consumed by the database-write compensation
    /// to know how many trailing records to remove.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_rows: Option<usize>,
    /// Last fatal error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SagaState {
    /// Creates a fresh state with all steps `Pending` and status `Idle`.
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            saga_id: SagaId::new(),
            file_name: file_name.into(),
            file_size,
            status: SagaStatus::Idle,
            steps: step_definitions()
                .iter()
                .map(PipelineStep::from_definition)
                .collect(),
            current_step: None,
            started_at: None,
            completed_at: None,
            processed_rows: None,
            error: None,
        }
    }

    /// The object-storage key this saga writes its input under.
    ///
    /// Keyed by `{saga_id}/{file_name}` so concurrent sagas never collide
    /// on storage, even for identical file names.
    pub fn storage_key(&self) -> String {
        format!("uploads/{}/{}", self.saga_id, self.file_name)
    }
}
