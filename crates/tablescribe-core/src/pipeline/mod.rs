//! Component M — Pipeline Orchestrator.
//!
//! Drives a session through the nine stages (`stage::PipelineStage`),
//! classifying each stage's failures as critical/degradable/optional and
//! reconstructing `completed_stages` on resume, grounded on
//! `original_source/src/pipeline.py::DDSessionProcessor`.

pub mod orchestrator;
pub mod session;
pub mod stage;

pub use orchestrator::{Orchestrator, OrchestratorError};
pub use session::{SessionConfig, SkipFlags};
pub use stage::{FailureClass, PipelineStage, StageStatus};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of executing a single stage, matching
/// `original_source`'s `StageResult` dataclass (stage, status, data,
/// errors, warnings, timing) so it serializes directly into checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: PipelineStage,
    pub status: StageStatus,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub duration_secs: Option<f64>,
}

impl StageResult {
    pub fn completed(stage: PipelineStage, data: Value, duration_secs: f64) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            data,
            errors: Vec::new(),
            warnings: Vec::new(),
            duration_secs: Some(duration_secs),
        }
    }

    pub fn failed(stage: PipelineStage, error: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            data: Value::Null,
            errors: vec![error.into()],
            warnings: Vec::new(),
            duration_secs: Some(duration_secs),
        }
    }

    pub fn skipped(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            data: Value::Null,
            errors: Vec::new(),
            warnings: vec![reason.into()],
            duration_secs: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_result_reports_success() {
        let result = StageResult::completed(PipelineStage::AudioConverted, Value::Null, 1.5);
        assert!(result.is_success());
        assert_eq!(result.duration_secs, Some(1.5));
    }

    #[test]
    fn failed_result_carries_the_error_message() {
        let result = StageResult::failed(PipelineStage::AudioChunked, "boom", 0.1);
        assert!(!result.is_success());
        assert_eq!(result.errors, vec!["boom".to_string()]);
    }
}
