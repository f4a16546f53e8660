//! The fixed pipeline step registry and per-stage latency table.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Number of steps in the ingest pipeline.
pub const STEP_COUNT: usize = 5;

/// Step id: upload the raw CSV to object storage.
pub const STEP_STORAGE_WRITE: &str = "storage_write";

/// Step id: enqueue the processing message.
pub const STEP_QUEUE_ENQUEUE: &str = "queue_enqueue";

/// Step id: parse the stored CSV into subject records.
pub const STEP_COMPUTE_PARSE: &str = "compute_parse";

/// Step id: write parsed records to the database.
pub const STEP_DB_WRITE: &str = "db_write";

/// Step id: notify the external webhook.
pub const STEP_WEBHOOK_NOTIFY: &str = "webhook_notify";

/// Which stage of the pipeline a step definition drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    StorageWrite,
    QueueEnqueue,
    ComputeParse,
    DatabaseWrite,
    WebhookNotify,
}

impl StepKind {
    /// Returns the registry id of this stage.
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::StorageWrite => STEP_STORAGE_WRITE,
            StepKind::QueueEnqueue => STEP_QUEUE_ENQUEUE,
            StepKind::ComputeParse => STEP_COMPUTE_PARSE,
            StepKind::DatabaseWrite => STEP_DB_WRITE,
            StepKind::WebhookNotify => STEP_WEBHOOK_NOTIFY,
        }
    }
}

/// One entry of the immutable step registry, shared across all saga runs.
#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    pub kind: StepKind,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Steps without a compensating handler are silently skipped during
    /// rollback.
    pub compensable: bool,
}

static DEFINITIONS: [StepDefinition; STEP_COUNT] = [
    StepDefinition {
        kind: StepKind::StorageWrite,
        id: STEP_STORAGE_WRITE,
        name: "Upload to Object Storage",
        description: "Uploading CSV file to the object store",
        compensable: true,
    },
    StepDefinition {
        kind: StepKind::QueueEnqueue,
        id: STEP_QUEUE_ENQUEUE,
        name: "Enqueue Processing Message",
        description: "Sending processing message to the work queue",
        // Irreversible once enqueued.
        compensable: false,
    },
    StepDefinition {
        kind: StepKind::ComputeParse,
        id: STEP_COMPUTE_PARSE,
        name: "Parse CSV Records",
        description: "Worker parsing and validating CSV data",
        // The undo is a no-op; it exists to keep the rollback loop symmetric.
        compensable: true,
    },
    StepDefinition {
        kind: StepKind::DatabaseWrite,
        id: STEP_DB_WRITE,
        name: "Write to Database",
        description: "Storing processed records in the record database",
        compensable: true,
    },
    StepDefinition {
        kind: StepKind::WebhookNotify,
        id: STEP_WEBHOOK_NOTIFY,
        name: "Webhook Callback",
        description: "Notifying external system of completion",
        // Last step; never needs compensation by construction.
        compensable: false,
    },
];

/// Returns the ordered, immutable step registry.
pub fn step_definitions() -> &'static [StepDefinition; STEP_COUNT] {
    &DEFINITIONS
}

/// Simulated network latency per stage.
///
/// The defaults mirror a plausible spread of remote-call durations so demo
/// runs visualize well; tests use [`StepDelays::none`].
#[derive(Debug, Clone)]
pub struct StepDelays {
    pub storage_write: Duration,
    pub queue_enqueue: Duration,
    pub compute_parse: Duration,
    pub database_write: Duration,
    pub webhook_notify: Duration,
    /// Pause before synthesizing an injected failure.
    pub injected_failure: Duration,
    pub undo_storage_write: Duration,
    pub undo_compute_parse: Duration,
    pub undo_database_write: Duration,
}

impl Default for StepDelays {
    fn default() -> Self {
        Self {
            storage_write: Duration::from_millis(1500),
            queue_enqueue: Duration::from_millis(800),
            compute_parse: Duration::from_millis(2000),
            database_write: Duration::from_millis(1200),
            webhook_notify: Duration::from_millis(600),
            injected_failure: Duration::from_millis(1000),
            undo_storage_write: Duration::from_millis(300),
            undo_compute_parse: Duration::from_millis(200),
            undo_database_write: Duration::from_millis(400),
        }
    }
}

impl StepDelays {
    /// Zero latency everywhere, for tests.
    pub fn none() -> Self {
        Self {
            storage_write: Duration::ZERO,
            queue_enqueue: Duration::ZERO,
            compute_parse: Duration::ZERO,
            database_write: Duration::ZERO,
            webhook_notify: Duration::ZERO,
            injected_failure: Duration::ZERO,
            undo_storage_write: Duration::ZERO,
            undo_compute_parse: Duration::ZERO,
            undo_database_write: Duration::ZERO,
        }
    }

    /// Latency applied before the forward handler of `kind` takes effect.
    pub fn forward(&self, kind: StepKind) -> Duration {
        match kind {
            StepKind::StorageWrite => self.storage_write,
            StepKind::QueueEnqueue => self.queue_enqueue,
            StepKind::ComputeParse => self.compute_parse,
            StepKind::DatabaseWrite => self.database_write,
            StepKind::WebhookNotify => self.webhook_notify,
        }
    }

    /// Latency applied before the compensating handler of `kind` takes effect.
    pub fn undo(&self, kind: StepKind) -> Duration {
        match kind {
            StepKind::StorageWrite => self.undo_storage_write,
            StepKind::ComputeParse => self.undo_compute_parse,
            StepKind::DatabaseWrite => self.undo_database_write,
            StepKind::QueueEnqueue | StepKind::WebhookNotify => Duration::ZERO,
        }
    }
}
