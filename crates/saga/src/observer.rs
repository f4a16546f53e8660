//! Observer capability for streaming state snapshots out of a run.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::state::SagaState;

/// Sink for full state snapshots, invoked synchronously after every
/// mutation.
///
/// Implementations must not block the orchestration task for a non-trivial
/// duration and must not panic; slow consumers should go through
/// [`ChannelObserver`].
pub trait StateObserver: Send + Sync {
    fn state_changed(&self, snapshot: &SagaState);
}

/// Observer that discards all snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl StateObserver for NullObserver {
    fn state_changed(&self, _snapshot: &SagaState) {}
}

/// Observer that records every snapshot, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    snapshots: Arc<Mutex<Vec<SagaState>>>,
}

impl RecordingObserver {
    /// Creates a new empty recording observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded snapshots, in notification order.
    pub fn snapshots(&self) -> Vec<SagaState> {
        self.snapshots.lock().unwrap().clone()
    }

    /// Returns the number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// Returns true if no snapshot has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().unwrap().is_empty()
    }
}

impl StateObserver for RecordingObserver {
    fn state_changed(&self, snapshot: &SagaState) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// Observer that forwards snapshots over an unbounded channel, decoupling
/// execution speed from consumer speed.
///
/// Snapshots arrive in mutation order, so a consumer never sees an older
/// snapshot after a newer one. Once the receiver is dropped, further
/// snapshots are silently discarded; the orchestrator never blocks on the
/// consumer either way.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SagaState>,
}

impl ChannelObserver {
    /// Creates a channel observer and the receiving half for the consumer.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SagaState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StateObserver for ChannelObserver {
    fn state_changed(&self, snapshot: &SagaState) {
        let _ = self.tx.send(snapshot.clone());
    }
}
