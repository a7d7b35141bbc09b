//! Audio-domain error types (transcoding, chunking, VAD).

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The external transcoder process exited non-zero, or its output file
    /// is missing or implausibly small (< 1 KiB).
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    /// The transcoder binary could not be located on PATH or via override.
    #[error("transcoder binary not found: {0}")]
    TranscoderNotFound(String),

    /// Voice activity detection failed.
    #[error("VAD error: {0}")]
    Vad(String),

    /// The chunker produced zero chunks for non-empty audio.
    #[error("chunking produced no chunks for non-empty audio")]
    ChunkingEmpty,

    #[error("invalid audio data: {0}")]
    InvalidAudio(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
