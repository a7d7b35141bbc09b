//! Audio-domain components: the transcoder (A), the VAD-hybrid chunker (B),
//! and their shared types.

pub mod chunker;
pub mod error;
pub mod transcoder;
pub mod types;
pub mod vad;

pub use error::AudioError;
pub use transcoder::{peak_normalize, Transcoder};
pub use types::{AudioChunk, AudioChunkMeta, SpeechInterval, VadParams, SAMPLE_RATE};
