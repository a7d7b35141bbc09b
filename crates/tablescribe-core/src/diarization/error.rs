//! Errors raised by Component E (Diarization Backend).

#[derive(Debug, thiserror::Error)]
pub enum DiarizationError {
    #[error("diarization backend '{backend}' is not configured: {message}")]
    NotConfigured { backend: String, message: String },

    #[error("diarization request to '{backend}' failed: {message}")]
    RequestFailed { backend: String, message: String },

    #[error("diarization backend '{backend}' returned an unparseable response: {message}")]
    BadResponse { backend: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
