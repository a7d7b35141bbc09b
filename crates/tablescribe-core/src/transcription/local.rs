//! Local (on-device) transcription backend, grounded on
//! `original_source/src/transcriber.py::FasterWhisperTranscriber` for the
//! device-selection/lazy-load shape. The actual model inference is out of
//! scope (spec.md §1): callers supply an `InferenceEngine` closure that
//! performs the real work, keeping the real model binding behind a narrow
//! seam rather than linking it directly into this module.

use crate::audio::types::AudioChunk;
use crate::model::ChunkTranscription;
use crate::preflight::{PreflightIssue, SupportsPreflight};

use super::error::TranscriptionError;
use super::TranscriptionBackend;

/// Injected model call: `(samples, sample_rate, language) -> segments`.
/// Kept as a trait object so tests can stub it without a real model.
pub trait InferenceEngine: Send + Sync {
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        language: &str,
    ) -> Result<ChunkTranscription, String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

pub struct LocalWhisperBackend {
    model_name: String,
    device: Device,
    engine: Option<Box<dyn InferenceEngine>>,
}

impl LocalWhisperBackend {
    pub fn new(model_name: impl Into<String>, device: Device) -> Self {
        Self {
            model_name: model_name.into(),
            device,
            engine: None,
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn InferenceEngine>) -> Self {
        self.engine = Some(engine);
        self
    }
}

impl SupportsPreflight for LocalWhisperBackend {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        let mut issues = Vec::new();
        if self.engine.is_none() {
            issues.push(PreflightIssue::error(
                "transcriber.local",
                format!("no inference engine configured for model '{}'", self.model_name),
            ));
        }
        if self.device == Device::Cuda {
            issues.push(PreflightIssue::warning(
                "transcriber.local",
                "CUDA requested; falls back to CPU automatically if unavailable at load time",
            ));
        }
        issues
    }
}

impl TranscriptionBackend for LocalWhisperBackend {
    fn name(&self) -> &'static str {
        "local-whisper"
    }

    fn transcribe_chunk(
        &self,
        chunk: &AudioChunk,
        language: &str,
    ) -> Result<ChunkTranscription, TranscriptionError> {
        let engine = self.engine.as_ref().ok_or_else(|| TranscriptionError::NotConfigured {
            backend: self.name().to_string(),
            message: "no inference engine configured".to_string(),
        })?;

        let mut result = engine
            .transcribe(&chunk.samples, chunk.sample_rate, language)
            .map_err(|message| TranscriptionError::RequestFailed {
                backend: self.name().to_string(),
                message,
            })?;

        result.chunk_index = chunk.chunk_index;
        result.chunk_start = chunk.start_time;
        result.chunk_end = chunk.end_time;
        for segment in &mut result.segments {
            segment.start_time += chunk.start_time;
            segment.end_time += chunk.start_time;
            if let Some(words) = segment.words.as_mut() {
                for word in words {
                    word.start += chunk.start_time;
                    word.end += chunk.start_time;
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TranscriptionSegment, Word};

    struct StubEngine;
    impl InferenceEngine for StubEngine {
        fn transcribe(
            &self,
            _samples: &[f32],
            _sample_rate: u32,
            language: &str,
        ) -> Result<ChunkTranscription, String> {
            Ok(ChunkTranscription {
                chunk_index: 0,
                chunk_start: 0.0,
                chunk_end: 0.0,
                segments: vec![TranscriptionSegment {
                    text: "hi".to_string(),
                    start_time: 1.0,
                    end_time: 2.0,
                    confidence: None,
                    words: None,
                }],
                language: language.to_string(),
            })
        }
    }

    #[test]
    fn without_engine_preflight_reports_an_error() {
        let backend = LocalWhisperBackend::new("small", Device::Cpu);
        assert_eq!(backend.preflight_check().len(), 1);
    }

    #[test]
    fn segment_timestamps_are_offset_by_chunk_start() {
        let backend =
            LocalWhisperBackend::new("small", Device::Cpu).with_engine(Box::new(StubEngine));
        let chunk = AudioChunk {
            chunk_index: 3,
            start_time: 30.0,
            end_time: 40.0,
            sample_rate: 16_000,
            samples: vec![0.0; 16_000],
        };
        let result = backend.transcribe_chunk(&chunk, "en").unwrap();
        assert_eq!(result.chunk_index, 3);
        assert_eq!(result.segments[0].start_time, 31.0);
        assert_eq!(result.segments[0].end_time, 32.0);
    }

    struct WordStubEngine;
    impl InferenceEngine for WordStubEngine {
        fn transcribe(
            &self,
            _samples: &[f32],
            _sample_rate: u32,
            language: &str,
        ) -> Result<ChunkTranscription, String> {
            Ok(ChunkTranscription {
                chunk_index: 0,
                chunk_start: 0.0,
                chunk_end: 0.0,
                segments: vec![TranscriptionSegment {
                    text: "hi there".to_string(),
                    start_time: 1.0,
                    end_time: 2.0,
                    confidence: None,
                    words: Some(vec![
                        Word {
                            word: "hi".to_string(),
                            start: 1.0,
                            end: 1.4,
                            probability: 0.9,
                        },
                        Word {
                            word: "there".to_string(),
                            start: 1.4,
                            end: 2.0,
                            probability: 0.9,
                        },
                    ]),
                }],
                language: language.to_string(),
            })
        }
    }

    #[test]
    fn word_timestamps_are_offset_by_chunk_start_alongside_the_segment() {
        let backend =
            LocalWhisperBackend::new("small", Device::Cpu).with_engine(Box::new(WordStubEngine));
        let chunk = AudioChunk {
            chunk_index: 0,
            start_time: 30.0,
            end_time: 40.0,
            sample_rate: 16_000,
            samples: vec![0.0; 16_000],
        };
        let result = backend.transcribe_chunk(&chunk, "en").unwrap();
        let words = result.segments[0].words.as_ref().unwrap();
        assert_eq!(words[0].start, 31.0);
        assert_eq!(words[0].end, 31.4);
        assert_eq!(words[1].start, 31.4);
        assert_eq!(words[1].end, 32.0);
    }
}
