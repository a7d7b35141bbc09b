//! A simple energy-threshold VAD, used as the default concrete
//! implementation of [`super::VoiceActivityDetector`] when no ML-backed VAD
//! capability is wired in. Frames the signal into 20ms windows, applies the
//! configured threshold, then merges runs using `min_speech_ms` /
//! `min_silence_ms` exactly as a real VAD model's post-processing would.

use crate::audio::error::AudioError;
use crate::audio::types::{SpeechInterval, VadParams};
use crate::audio::vad::VoiceActivityDetector;

const FRAME_MS: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct EnergyVad;

impl VoiceActivityDetector for EnergyVad {
    fn detect(
        &self,
        samples: &[f32],
        sample_rate: u32,
        params: VadParams,
    ) -> Result<Vec<SpeechInterval>, AudioError> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        if sample_rate == 0 {
            return Err(AudioError::Vad("sample_rate must be > 0".into()));
        }

        let frame_len = ((sample_rate as u64 * FRAME_MS as u64) / 1000).max(1) as usize;
        let mut frame_is_speech = Vec::with_capacity(samples.len() / frame_len + 1);
        for frame in samples.chunks(frame_len) {
            let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt();
            frame_is_speech.push(rms >= params.threshold);
        }

        let raw_intervals = runs_to_intervals(&frame_is_speech, frame_len, sample_rate);
        Ok(merge_short_gaps(raw_intervals, params))
    }
}

fn runs_to_intervals(is_speech: &[bool], frame_len: usize, sample_rate: u32) -> Vec<SpeechInterval> {
    let frame_secs = frame_len as f64 / sample_rate as f64;
    let mut intervals = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, &speech) in is_speech.iter().enumerate() {
        match (speech, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                intervals.push(SpeechInterval {
                    start: start as f64 * frame_secs,
                    end: i as f64 * frame_secs,
                });
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        intervals.push(SpeechInterval {
            start: start as f64 * frame_secs,
            end: is_speech.len() as f64 * frame_secs,
        });
    }
    intervals
}

/// Drop speech runs shorter than `min_speech_ms` and merge across silence
/// gaps shorter than `min_silence_ms`, matching how a real VAD model's
/// hangover/min-duration logic behaves.
fn merge_short_gaps(intervals: Vec<SpeechInterval>, params: VadParams) -> Vec<SpeechInterval> {
    let min_speech = params.min_speech_ms as f64 / 1000.0;
    let min_silence = params.min_silence_ms as f64 / 1000.0;

    let mut merged: Vec<SpeechInterval> = Vec::new();
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if interval.start - last.end < min_silence {
                last.end = interval.end;
                continue;
            }
        }
        merged.push(interval);
    }

    merged
        .into_iter()
        .filter(|i| i.duration() >= min_speech)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, secs: f64, amp: f32) -> Vec<f32> {
        let n = (secs * 16_000.0) as usize;
        (0..n)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / 16_000.0).sin())
            .collect()
    }

    #[test]
    fn detects_speech_then_silence() {
        let mut samples = tone(220.0, 1.0, 0.8);
        samples.extend(vec![0.0; 16_000]); // 1s silence
        samples.extend(tone(220.0, 1.0, 0.8));

        let vad = EnergyVad;
        let intervals = vad
            .detect(
                &samples,
                16_000,
                VadParams {
                    threshold: 0.1,
                    min_speech_ms: 100,
                    min_silence_ms: 100,
                },
            )
            .unwrap();

        assert_eq!(intervals.len(), 2);
        assert!(intervals[0].start < 0.1);
        assert!(intervals[1].start > 1.5);
    }

    #[test]
    fn empty_input_yields_no_intervals() {
        let vad = EnergyVad;
        let intervals = vad.detect(&[], 16_000, VadParams::default()).unwrap();
        assert!(intervals.is_empty());
    }
}
