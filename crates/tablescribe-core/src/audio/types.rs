//! Shared audio types: the canonical sample rate, chunk metadata, and the
//! speech-interval type produced by VAD.

/// Canonical sample rate for the whole pipeline (§6: "16 kHz mono").
pub const SAMPLE_RATE: u32 = 16_000;

/// A contiguous, possibly-overlapping slice of the source recording.
///
/// Owns its sample buffer during a live process run; on checkpoint resume
/// the buffer is re-derived from the converted WAV, so only the metadata
/// needs to survive on disk (spec.md §9, "ownership of in-memory audio
/// buffers").
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub chunk_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Persistable metadata for an [`AudioChunk`], with the sample buffer
/// dropped (used by the checkpoint store — see spec.md §3).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AudioChunkMeta {
    pub chunk_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub sample_rate: u32,
}

impl From<&AudioChunk> for AudioChunkMeta {
    fn from(chunk: &AudioChunk) -> Self {
        Self {
            chunk_index: chunk.chunk_index,
            start_time: chunk.start_time,
            end_time: chunk.end_time,
            sample_rate: chunk.sample_rate,
        }
    }
}

/// A speech interval detected by voice activity detection; used only to find
/// pause candidates for the chunker, per the glossary's definition of VAD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechInterval {
    pub start: f64,
    pub end: f64,
}

impl SpeechInterval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Parameters controlling voice activity detection.
#[derive(Debug, Clone, Copy)]
pub struct VadParams {
    pub threshold: f32,
    pub min_speech_ms: u32,
    pub min_silence_ms: u32,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_speech_ms: 250,
            min_silence_ms: 300,
        }
    }
}
