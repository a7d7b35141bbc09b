//! Unified error types for tablescribe-core.
//!
//! Mirrors the hierarchical `thiserror` scheme of the pipeline's individual
//! stages: each domain gets its own error enum, and `TablescribeError`
//! collects them for code that crosses domain boundaries (the orchestrator).

pub use crate::audio::AudioError;
pub use crate::checkpoint::CheckpointError;
pub use crate::classification::ClassificationError;
pub use crate::diarization::DiarizationError;
pub use crate::intermediate::IntermediateError;
pub use crate::knowledge::KnowledgeError;
pub use crate::ratelimit::RateLimitError;
pub use crate::transcription::TranscriptionError;

/// Top-level error type for tablescribe-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TablescribeError {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("diarization error: {0}")]
    Diarization(#[from] DiarizationError),

    #[error("classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("intermediate output error: {0}")]
    Intermediate(#[from] IntermediateError),

    #[error("knowledge extraction error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TablescribeError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convenience result type using `TablescribeError`.
pub type Result<T> = std::result::Result<T, TablescribeError>;

impl From<anyhow::Error> for TablescribeError {
    fn from(err: anyhow::Error) -> Self {
        TablescribeError::Other(err.to_string())
    }
}
