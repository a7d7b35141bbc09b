//! Component A — Audio Transcoder.
//!
//! Normalizes arbitrary input media to canonical PCM (16 kHz, mono, 16-bit)
//! by shelling out to an external transcoder binary (conceptually `ffmpeg`;
//! the binary itself is an opaque external collaborator per spec.md §1).
//! Grounded on `original_source/src/audio_processor.py::_find_ffmpeg` /
//! `convert_to_wav` and on the external-sidecar pattern of shelling out to
//! a binary discovered on `PATH` rather than linking a codec library.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::audio::error::AudioError;
use crate::audio::types::SAMPLE_RATE;

/// Minimum plausible output size for a successful transcode (spec.md §4.A).
const MIN_OUTPUT_BYTES: u64 = 1024;

/// Wall-clock timeout for a single snippet extraction call (spec.md §4.J).
pub const SNIPPET_EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable used to override transcoder binary discovery.
pub const TRANSCODER_PATH_ENV: &str = "TABLESCRIBE_FFMPEG_PATH";

/// Shells out to an external transcoder binary to normalize audio and to
/// stream-extract time ranges without loading whole files into memory.
#[derive(Debug, Clone)]
pub struct Transcoder {
    binary: PathBuf,
}

impl Transcoder {
    /// Discover the transcoder binary: explicit env override first, then
    /// PATH search, falling back to the bare command name (and letting the
    /// first invocation fail with a clear error), matching
    /// `_find_ffmpeg`'s PATH-then-local-then-bare-name fallback chain.
    pub fn discover() -> Self {
        if let Ok(path) = std::env::var(TRANSCODER_PATH_ENV) {
            return Self {
                binary: PathBuf::from(path),
            };
        }
        match which("ffmpeg") {
            Some(path) => Self { binary: path },
            None => Self {
                binary: PathBuf::from("ffmpeg"),
            },
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Convert arbitrary input media to 16 kHz mono PCM WAV.
    pub fn transcode(&self, input: &Path, output: &Path) -> Result<(), AudioError> {
        let status = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .args(["-ar", &SAMPLE_RATE.to_string()])
            .args(["-ac", "1"])
            .arg("-y")
            .arg(output)
            .output()
            .map_err(|e| AudioError::TranscoderNotFound(e.to_string()))?;

        if !status.status.success() {
            let stderr = String::from_utf8_lossy(&status.stderr);
            return Err(AudioError::TranscodeFailed(stderr.trim().to_string()));
        }

        let size = output
            .metadata()
            .map(|m| m.len())
            .map_err(|e| AudioError::TranscodeFailed(format!("missing output: {e}")))?;
        if size < MIN_OUTPUT_BYTES {
            return Err(AudioError::TranscodeFailed(format!(
                "output implausibly small ({size} bytes)"
            )));
        }
        Ok(())
    }

    /// Stream-extract `[start, end)` from `input` into `output` using the
    /// transcoder's seek/duration flags, bounded by a hard wall-clock
    /// timeout. The full source is never loaded into memory (spec.md §4.J).
    pub fn extract_range(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        end: f64,
    ) -> Result<(), AudioError> {
        let duration = (end - start).max(0.01);
        let mut child = Command::new(&self.binary)
            .args(["-ss", &format!("{start:.3}")])
            .args(["-t", &format!("{duration:.3}")])
            .arg("-i")
            .arg(input)
            .arg("-y")
            .arg(output)
            .spawn()
            .map_err(|e| AudioError::TranscoderNotFound(e.to_string()))?;

        let deadline = std::time::Instant::now() + SNIPPET_EXTRACT_TIMEOUT;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if status.success() {
                        return Ok(());
                    }
                    return Err(AudioError::TranscodeFailed(format!(
                        "extraction exited with {status}"
                    )));
                }
                Ok(None) => {
                    if std::time::Instant::now() >= deadline {
                        let _ = child.kill();
                        return Err(AudioError::TranscodeFailed(
                            "extraction timed out (30s limit)".into(),
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => return Err(AudioError::TranscodeFailed(e.to_string())),
            }
        }
    }

    /// Load a WAV's full duration in seconds from its header.
    pub fn duration_seconds(&self, wav_path: &Path) -> Result<f64, AudioError> {
        let reader = hound::WavReader::open(wav_path)
            .map_err(|e| AudioError::InvalidAudio(e.to_string()))?;
        let spec = reader.spec();
        let frames = reader.len() as f64 / spec.channels as f64;
        Ok(frames / spec.sample_rate as f64)
    }

    /// Load `[start, end)` seconds of a canonical WAV as a mono f32 buffer.
    pub fn load_range(&self, wav_path: &Path, start: f64, end: f64) -> Result<Vec<f32>, AudioError> {
        let mut reader =
            hound::WavReader::open(wav_path).map_err(|e| AudioError::InvalidAudio(e.to_string()))?;
        let spec = reader.spec();
        let start_sample = (start.max(0.0) * spec.sample_rate as f64) as u32;
        let end_sample = (end.max(start) * spec.sample_rate as f64) as u32;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .samples::<i32>()
                .skip(start_sample as usize)
                .take((end_sample.saturating_sub(start_sample)) as usize)
                .filter_map(Result::ok)
                .map(|s| s as f32 / i16::MAX as f32)
                .collect(),
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .skip(start_sample as usize)
                .take((end_sample.saturating_sub(start_sample)) as usize)
                .filter_map(Result::ok)
                .collect(),
        };
        Ok(samples)
    }
}

/// Peak-normalize a buffer: divide by the maximum absolute sample. Identity
/// on silence (all-zero input), per spec.md §4.A.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
}

fn which(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(binary);
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_normalize_is_identity_on_silence() {
        let mut samples = vec![0.0_f32; 10];
        peak_normalize(&mut samples);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn peak_normalize_scales_to_unit_peak() {
        let mut samples = vec![0.5_f32, -1.0, 0.25];
        peak_normalize(&mut samples);
        assert!((samples[1].abs() - 1.0).abs() < 1e-6);
        assert!(samples[0] > 0.0 && samples[0] < 1.0);
    }

    #[test]
    fn transcode_reports_missing_binary() {
        let transcoder = Transcoder::with_binary("definitely-not-a-real-binary-xyz");
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.wav");
        std::fs::write(&input, b"RIFF....").unwrap();
        let output = tmp.path().join("out.wav");
        let err = transcoder.transcode(&input, &output).unwrap_err();
        assert!(matches!(err, AudioError::TranscoderNotFound(_)));
    }
}
