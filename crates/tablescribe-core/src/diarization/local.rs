//! Local diarization backend, grounded on
//! `original_source/src/diarizer.py::SpeakerDiarizer` (lazy thread-safe
//! pipeline load, GPU→CPU fallback via a sticky latch once CUDA embedding
//! extraction has failed once). The actual PyAnnote model is out of scope
//! (spec.md §1); callers inject a `DiarizationEngine`.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::model::SpeakerSegment;
use crate::preflight::{PreflightIssue, SupportsPreflight};

use super::error::DiarizationError;
use super::{DiarizationBackend, SpeakerEmbedding};

pub trait DiarizationEngine: Send + Sync {
    fn diarize(
        &self,
        audio_path: &Path,
        use_cuda: bool,
    ) -> Result<(Vec<SpeakerSegment>, Vec<(String, SpeakerEmbedding)>), String>;
}

pub struct LocalDiarizer {
    engine: Option<Box<dyn DiarizationEngine>>,
    cuda_requested: bool,
    cuda_embedding_failed: AtomicBool,
}

impl LocalDiarizer {
    pub fn new(cuda_requested: bool) -> Self {
        Self {
            engine: None,
            cuda_requested,
            cuda_embedding_failed: AtomicBool::new(false),
        }
    }

    pub fn with_engine(mut self, engine: Box<dyn DiarizationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    fn use_cuda(&self) -> bool {
        self.cuda_requested && !self.cuda_embedding_failed.load(Ordering::Relaxed)
    }
}

impl SupportsPreflight for LocalDiarizer {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        if self.engine.is_none() {
            vec![PreflightIssue::warning(
                "diarizer.local",
                "no diarization engine configured; diarization will be limited",
            )]
        } else {
            Vec::new()
        }
    }
}

impl DiarizationBackend for LocalDiarizer {
    fn name(&self) -> &'static str {
        "pyannote"
    }

    fn diarize(
        &self,
        audio_path: &Path,
    ) -> Result<(Vec<SpeakerSegment>, Vec<(String, SpeakerEmbedding)>), DiarizationError> {
        let engine = self.engine.as_ref().ok_or_else(|| DiarizationError::NotConfigured {
            backend: self.name().to_string(),
            message: "no diarization engine configured".to_string(),
        })?;

        match engine.diarize(audio_path, self.use_cuda()) {
            Ok(result) => Ok(result),
            Err(message) if self.use_cuda() => {
                // Latch the GPU failure so subsequent chunks/sessions don't
                // keep retrying a broken CUDA embedding path.
                self.cuda_embedding_failed.store(true, Ordering::Relaxed);
                engine
                    .diarize(audio_path, false)
                    .map_err(|message| DiarizationError::RequestFailed {
                        backend: self.name().to_string(),
                        message: format!("{message} (after CUDA fallback)"),
                    })
            }
            Err(message) => Err(DiarizationError::RequestFailed {
                backend: self.name().to_string(),
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FlakyCudaEngine {
        cuda_calls: Mutex<u32>,
    }
    impl DiarizationEngine for FlakyCudaEngine {
        fn diarize(
            &self,
            _audio_path: &Path,
            use_cuda: bool,
        ) -> Result<(Vec<SpeakerSegment>, Vec<(String, SpeakerEmbedding)>), String> {
            if use_cuda {
                *self.cuda_calls.lock().unwrap() += 1;
                Err("CUDA OOM".to_string())
            } else {
                Ok((Vec::new(), Vec::new()))
            }
        }
    }

    #[test]
    fn falls_back_to_cpu_once_and_latches() {
        let diarizer = LocalDiarizer::new(true).with_engine(Box::new(FlakyCudaEngine {
            cuda_calls: Mutex::new(0),
        }));
        assert!(diarizer.diarize(Path::new("a.wav")).is_ok());
        assert!(!diarizer.use_cuda());
        // Second call should go straight to CPU without retrying CUDA.
        assert!(diarizer.diarize(Path::new("b.wav")).is_ok());
    }

    #[test]
    fn without_engine_diarize_errors() {
        let diarizer = LocalDiarizer::new(false);
        assert!(diarizer.diarize(Path::new("a.wav")).is_err());
    }
}
