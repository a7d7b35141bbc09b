//! Component O — Status Tracker.
//!
//! Broadcasts per-session, per-stage status updates to an external sink.
//! Treated as write-only from the core's perspective (spec.md §4.O);
//! grounded on a `ProgressCallback` type alias shape
//! (`Arc<dyn Fn(TranscriptionStage) + Send + Sync>`), generalized here to a
//! trait object so alternate sinks can be plugged in for tests.

use crate::pipeline::stage::{PipelineStage, StageStatus};

/// One progress update published at a stage boundary or during a debounced
/// in-stage tick (spec.md §4.M: "5% of progress or 30s wall-clock").
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub session_id: String,
    pub stage_number: u8,
    pub status: StageStatus,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// Write-only sink for pipeline status updates. Implementations are free
/// (file, in-memory, IPC) per spec.md §4.O.
pub trait StatusTracker: Send + Sync {
    fn start_session(&self, session_id: &str);
    fn update_stage(&self, update: StatusUpdate);
    fn complete_session(&self, session_id: &str);
    fn fail_session(&self, session_id: &str, message: &str);
}

/// In-memory tracker used by tests and as a sane default for library callers
/// that don't need an external sink.
#[derive(Debug, Default)]
pub struct InMemoryStatusTracker {
    events: std::sync::Mutex<Vec<String>>,
}

impl InMemoryStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("status tracker mutex poisoned").clone()
    }
}

impl StatusTracker for InMemoryStatusTracker {
    fn start_session(&self, session_id: &str) {
        self.events
            .lock()
            .expect("status tracker mutex poisoned")
            .push(format!("start:{session_id}"));
    }

    fn update_stage(&self, update: StatusUpdate) {
        self.events.lock().expect("status tracker mutex poisoned").push(format!(
            "stage:{}:{}:{:?}",
            update.session_id, update.stage_number, update.status
        ));
    }

    fn complete_session(&self, session_id: &str) {
        self.events
            .lock()
            .expect("status tracker mutex poisoned")
            .push(format!("complete:{session_id}"));
    }

    fn fail_session(&self, session_id: &str, message: &str) {
        self.events
            .lock()
            .expect("status tracker mutex poisoned")
            .push(format!("fail:{session_id}:{message}"));
    }
}

/// Emits every event through `tracing`, so a session's progress shows up
/// wherever the CLI's `tracing-subscriber` is configured to send it (stderr
/// by default, filtered by `--log-level`).
#[derive(Debug, Default)]
pub struct TracingStatusTracker;

impl StatusTracker for TracingStatusTracker {
    fn start_session(&self, session_id: &str) {
        tracing::info!(session_id, "session started");
    }

    fn update_stage(&self, update: StatusUpdate) {
        tracing::info!(
            session_id = %update.session_id,
            stage = update.stage_number,
            status = ?update.status,
            "{}",
            update.message
        );
    }

    fn complete_session(&self, session_id: &str) {
        tracing::info!(session_id, "session completed");
    }

    fn fail_session(&self, session_id: &str, message: &str) {
        tracing::error!(session_id, message, "session failed");
    }
}

/// Helper to derive a human-readable message for a stage transition,
/// mirroring how each stage in the original pipeline logged its own status.
pub fn stage_message(stage: PipelineStage, status: StageStatus) -> String {
    format!("{} -> {:?}", stage.name(), status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_tracker_records_events_in_order() {
        let tracker = InMemoryStatusTracker::new();
        tracker.start_session("s1");
        tracker.update_stage(StatusUpdate {
            session_id: "s1".into(),
            stage_number: 1,
            status: StageStatus::Completed,
            message: "done".into(),
            details: None,
        });
        tracker.complete_session("s1");

        let events = tracker.events();
        assert_eq!(events.len(), 3);
        assert!(events[0].starts_with("start:"));
        assert!(events[2].starts_with("complete:"));
    }
}
