//! Errors raised by Component L (Checkpoint Store).

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint for stage '{stage}' is corrupt: {message}")]
    Corrupt { stage: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
