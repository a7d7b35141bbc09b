//! Errors raised by Component G (Classifier Backend).

#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("classifier backend '{backend}' is not configured: {message}")]
    NotConfigured { backend: String, message: String },

    #[error("classifier backend '{backend}' failed: {message}")]
    RequestFailed { backend: String, message: String },

    #[error("offloaded classification job timed out after {elapsed_secs:.1}s")]
    Timeout { elapsed_secs: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
