//! Errors raised by Component C (Transcription Backend).

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription backend '{backend}' is not configured: {message}")]
    NotConfigured { backend: String, message: String },

    #[error("transcription request to '{backend}' failed: {message}")]
    RequestFailed { backend: String, message: String },

    #[error("transcription backend '{backend}' returned an unparseable response: {message}")]
    BadResponse { backend: String, message: String },

    #[error(transparent)]
    RateLimit(#[from] crate::ratelimit::RateLimitError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
