//! Component C — Transcription Backend, and Component D — Overlap Merger.
//!
//! Grounded on a sync-dispatch, per-provider-registry trait shape and
//! `original_source/src/transcriber.py` (local faster-whisper vs. cloud
//! Groq/OpenAI-compatible backends). The actual ML inference and HTTP
//! transcription model weights are out of scope (spec.md §1); this module
//! provides the dispatch seam a real engine plugs into.

pub mod error;
pub mod local;
pub mod merger;
pub mod remote;

pub use error::TranscriptionError;
pub use merger::TranscriptionMerger;

use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::types::AudioChunk;
use crate::model::ChunkTranscription;
use crate::preflight::SupportsPreflight;

/// Implemented by every transcription backend (local model wrapper or
/// remote API client), narrowed to the single `transcribe_chunk` operation
/// this pipeline needs.
pub trait TranscriptionBackend: Send + Sync + SupportsPreflight {
    fn name(&self) -> &'static str;

    fn transcribe_chunk(
        &self,
        chunk: &AudioChunk,
        language: &str,
    ) -> Result<ChunkTranscription, TranscriptionError>;
}

/// Registry of named backends, mirroring `provider::ProviderRegistry`.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn TranscriptionBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Arc<dyn TranscriptionBackend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TranscriptionBackend>> {
        self.backends.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::PreflightIssue;

    struct StubBackend;
    impl SupportsPreflight for StubBackend {
        fn preflight_check(&self) -> Vec<PreflightIssue> {
            Vec::new()
        }
    }
    impl TranscriptionBackend for StubBackend {
        fn name(&self) -> &'static str {
            "stub"
        }
        fn transcribe_chunk(
            &self,
            chunk: &AudioChunk,
            language: &str,
        ) -> Result<ChunkTranscription, TranscriptionError> {
            Ok(ChunkTranscription {
                chunk_index: chunk.chunk_index,
                chunk_start: chunk.start_time,
                chunk_end: chunk.end_time,
                segments: Vec::new(),
                language: language.to_string(),
            })
        }
    }

    #[test]
    fn registry_looks_up_backends_by_name() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(StubBackend));
        assert!(registry.get("stub").is_some());
        assert!(registry.get("missing").is_none());
    }
}
