//! Component E — Diarization Backend, grounded on
//! `original_source/src/diarizer.py::BaseDiarizer` (local PyAnnote pipeline
//! with lazy thread-safe loading and GPU→CPU fallback; a Hugging Face
//! Inference API offload).

pub mod error;
pub mod local;
pub mod remote;

pub use error::DiarizationError;

use std::path::Path;

use crate::audio::transcoder::Transcoder;
use crate::model::SpeakerSegment;
use crate::preflight::SupportsPreflight;

/// A per-speaker embedding vector, extracted alongside diarization so the
/// pipeline can later deduplicate or track speakers across sessions. Not
/// every backend can produce these (spec.md: "warn and skip on failure").
pub type SpeakerEmbedding = Vec<f32>;

pub trait DiarizationBackend: Send + Sync + SupportsPreflight {
    fn name(&self) -> &'static str;

    /// Diarize the audio at `audio_path`, returning speaker-labeled time
    /// intervals and (when available) one embedding vector per speaker id.
    fn diarize(
        &self,
        audio_path: &Path,
    ) -> Result<(Vec<SpeakerSegment>, Vec<(String, SpeakerEmbedding)>), DiarizationError>;
}

/// Degenerate backend used when diarization is unavailable: the whole file
/// is attributed to a single `SPEAKER_00` spanning the full audio, matching
/// `_create_fallback_diarization`'s "single speaker for the entire audio".
/// No embeddings are produced.
pub struct FallbackDiarizer {
    transcoder: Transcoder,
}

impl FallbackDiarizer {
    pub fn new(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }
}

impl SupportsPreflight for FallbackDiarizer {}

impl DiarizationBackend for FallbackDiarizer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn diarize(
        &self,
        audio_path: &Path,
    ) -> Result<(Vec<SpeakerSegment>, Vec<(String, SpeakerEmbedding)>), DiarizationError> {
        let duration = self
            .transcoder
            .duration_seconds(audio_path)
            .map_err(|e| DiarizationError::RequestFailed {
                backend: self.name().to_string(),
                message: e.to_string(),
            })?;
        let segment = SpeakerSegment {
            speaker_id: "SPEAKER_00".to_string(),
            start_time: 0.0,
            end_time: duration,
        };
        Ok((vec![segment], Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_silent_wav(path: &std::path::Path, seconds: f64) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(16_000.0 * seconds) as usize {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn fallback_diarizer_yields_one_segment_spanning_the_audio() {
        let dir = tempfile::tempdir().unwrap();
        let wav_path = dir.path().join("x.wav");
        write_silent_wav(&wav_path, 2.0);

        let diarizer = FallbackDiarizer::new(Transcoder::with_binary("ffmpeg"));
        let (segments, embeddings) = diarizer.diarize(&wav_path).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].speaker_id, "SPEAKER_00");
        assert_eq!(segments[0].start_time, 0.0);
        assert!((segments[0].end_time - 2.0).abs() < 1e-6);
        assert!(embeddings.is_empty());
    }
}
