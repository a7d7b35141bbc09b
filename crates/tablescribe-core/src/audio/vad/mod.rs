//! Voice activity detection: an opaque capability used only to find pause
//! candidates for the chunker (see GLOSSARY). The actual detection model is
//! out of scope for this crate (spec.md §1); what matters here is the
//! trait boundary and a reasonable default implementation so the pipeline
//! runs without an external model configured.

mod energy;

pub use energy::EnergyVad;

use crate::audio::error::AudioError;
use crate::audio::types::{SpeechInterval, VadParams};

/// Capability trait for voice activity detection, mirroring the
/// `TranscriptionBackend`/`DiarizationBackend` sum-type-over-trait-object
/// shape used throughout this crate.
pub trait VoiceActivityDetector: Send + Sync {
    fn detect(&self, samples: &[f32], sample_rate: u32, params: VadParams)
    -> Result<Vec<SpeechInterval>, AudioError>;
}

/// No-op detector: treats the entire buffer as one speech interval. Used
/// when no real VAD capability is configured; the chunker still produces
/// fixed-length chunks via the `ideal_end` fallback path.
#[derive(Debug, Clone, Default)]
pub struct NoopVad;

impl VoiceActivityDetector for NoopVad {
    fn detect(
        &self,
        samples: &[f32],
        sample_rate: u32,
        _params: VadParams,
    ) -> Result<Vec<SpeechInterval>, AudioError> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        let duration = samples.len() as f64 / sample_rate as f64;
        Ok(vec![SpeechInterval {
            start: 0.0,
            end: duration,
        }])
    }
}
