//! Component B — VAD-Hybrid Chunker.
//!
//! Produces overlapping chunks that respect speech boundaries while bounding
//! chunk length, following the gap-scoring search-window algorithm of
//! spec.md §4.B. Grounded structurally on a streaming chunker's overlap
//! buffer bookkeeping and `ChunkerConfig` shape, reworked from a live
//! streaming consumer into a batch algorithm over a fully loaded,
//! already-VAD'd buffer, and on `original_source/src/chunker.py`'s
//! pause-aligned cut search.

use tracing::warn;

use crate::audio::error::AudioError;
use crate::audio::types::{AudioChunk, SpeechInterval, VadParams, SAMPLE_RATE};
use crate::audio::vad::VoiceActivityDetector;

/// Configuration for the hybrid chunker.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Target chunk length before searching for a pause-aligned cut.
    pub max_chunk_length: f64,
    /// Overlap retained between consecutive chunks.
    pub overlap_length: f64,
    /// How far around `ideal_end` to search for a silence gap.
    pub search_window: f64,
    pub vad: VadParams,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: 600.0,
            overlap_length: 10.0,
            search_window: 60.0,
            vad: VadParams::default(),
        }
    }
}

/// Invoked after each chunk is emitted with `(chunk, total_duration)`.
/// Failures are logged and never propagate (spec.md §4.B, §9).
pub type ProgressCallback<'a> = dyn FnMut(&AudioChunk, f64) + 'a;

/// Chunk a fully loaded, peak-normalized audio buffer.
pub fn chunk(
    samples: &[f32],
    vad: &dyn VoiceActivityDetector,
    config: ChunkerConfig,
    mut progress: Option<&mut ProgressCallback<'_>>,
) -> Result<Vec<AudioChunk>, AudioError> {
    if samples.is_empty() {
        return Err(AudioError::ChunkingEmpty);
    }

    let total_duration = samples.len() as f64 / SAMPLE_RATE as f64;
    let speech = vad.detect(samples, SAMPLE_RATE, config.vad)?;
    let gaps = silence_gaps(&speech);

    let mut chunks = Vec::new();
    let mut chunk_start = 0.0_f64;
    let mut chunk_index = 0usize;

    loop {
        let ideal_end = chunk_start + config.max_chunk_length;
        let chunk_end = if ideal_end >= total_duration {
            total_duration
        } else {
            best_cut(&gaps, ideal_end, config.search_window).unwrap_or(ideal_end)
        };

        let chunk = slice_chunk(samples, chunk_index, chunk_start, chunk_end);
        if let Some(cb) = progress.as_deref_mut() {
            // Progress callbacks must be exception-safe (spec.md §9): a
            // panic here is caught and logged, never fatal to chunking.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                cb(&chunk, total_duration);
            }));
            if result.is_err() {
                warn!("chunker progress callback panicked; continuing");
            }
        }
        chunks.push(chunk);
        chunk_index += 1;

        if chunk_end >= total_duration {
            break;
        }
        chunk_start = chunk_end - config.overlap_length;
    }

    if chunks.is_empty() {
        return Err(AudioError::ChunkingEmpty);
    }
    Ok(chunks)
}

fn slice_chunk(samples: &[f32], chunk_index: usize, start: f64, end: f64) -> AudioChunk {
    let start_sample = (start * SAMPLE_RATE as f64).round() as usize;
    let end_sample = ((end * SAMPLE_RATE as f64).round() as usize).min(samples.len());
    let start_sample = start_sample.min(end_sample);
    AudioChunk {
        chunk_index,
        start_time: start,
        end_time: end,
        sample_rate: SAMPLE_RATE,
        samples: samples[start_sample..end_sample].to_vec(),
    }
}

/// Silence gaps between adjacent speech intervals (spec.md §4.B step 3).
fn silence_gaps(speech: &[SpeechInterval]) -> Vec<SpeechInterval> {
    speech
        .windows(2)
        .map(|pair| SpeechInterval {
            start: pair[0].end,
            end: pair[1].start,
        })
        .filter(|gap| gap.end > gap.start)
        .collect()
}

/// Find the gap within `±search_window` of `ideal_end` minimizing
/// `|gap_end - ideal_end| - 2 * gap_width`.
fn best_cut(gaps: &[SpeechInterval], ideal_end: f64, search_window: f64) -> Option<f64> {
    gaps.iter()
        .filter(|gap| (gap.end - ideal_end).abs() <= search_window)
        .min_by(|a, b| score(a, ideal_end).partial_cmp(&score(b, ideal_end)).unwrap())
        .map(|gap| gap.end)
}

fn score(gap: &SpeechInterval, ideal_end: f64) -> f64 {
    (gap.end - ideal_end).abs() - 2.0 * gap.duration()
}
