//! Component D — Overlap Merger, grounded on
//! `original_source/src/merger.py::TranscriptionMerger`. The original keeps
//! a `similarity_threshold` field for a planned LCS-based merge but its
//! actual `_merge_two_chunks` always falls through to the time-based split;
//! this port keeps the same observable behavior (spec.md §9: "the simpler,
//! already-dominant code path").

use crate::model::{ChunkTranscription, TranscriptionSegment};

pub struct TranscriptionMerger {
    #[allow(dead_code)]
    similarity_threshold: f64,
}

impl Default for TranscriptionMerger {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl TranscriptionMerger {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Merge a list of (ordered) chunk transcriptions into one continuous
    /// sequence of segments, splitting each overlapping pair at the end
    /// time of the earlier chunk.
    pub fn merge_transcriptions(
        &self,
        transcriptions: &[ChunkTranscription],
    ) -> Vec<TranscriptionSegment> {
        match transcriptions {
            [] => Vec::new(),
            [only] => only.segments.clone(),
            [first, rest @ ..] => {
                let mut merged = first.segments.clone();
                let mut prev_end = first.chunk_end;
                for chunk in rest {
                    merged = merge_by_time(&merged, &chunk.segments, prev_end);
                    prev_end = chunk.chunk_end;
                }
                merged
            }
        }
    }

    pub fn full_text(segments: &[TranscriptionSegment]) -> String {
        segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Cut two adjacent chunks' segments at `split_time`: keep segments from
/// `a` ending at or before it, and segments from `b` starting at or after
/// it. Segments straddling the boundary are dropped from both sides, same
/// as the original (no interpolation, no LCS fallback).
fn merge_by_time(
    a: &[TranscriptionSegment],
    b: &[TranscriptionSegment],
    split_time: f64,
) -> Vec<TranscriptionSegment> {
    let mut result: Vec<TranscriptionSegment> = a
        .iter()
        .filter(|seg| seg.end_time <= split_time)
        .cloned()
        .collect();
    result.extend(b.iter().filter(|seg| seg.start_time >= split_time).cloned());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, start: f64, end: f64) -> TranscriptionSegment {
        TranscriptionSegment {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            confidence: None,
            words: None,
        }
    }

    fn chunk(index: usize, start: f64, end: f64, segments: Vec<TranscriptionSegment>) -> ChunkTranscription {
        ChunkTranscription {
            chunk_index: index,
            chunk_start: start,
            chunk_end: end,
            segments,
            language: "en".to_string(),
        }
    }

    #[test]
    fn single_chunk_passes_through_unchanged() {
        let merger = TranscriptionMerger::default();
        let c = chunk(0, 0.0, 10.0, vec![segment("hello", 0.0, 1.0)]);
        let merged = merger.merge_transcriptions(&[c]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn overlap_is_split_at_the_earlier_chunks_end_time() {
        let merger = TranscriptionMerger::default();
        let a = chunk(
            0,
            0.0,
            100.0,
            vec![segment("before", 10.0, 20.0), segment("straddle-a", 95.0, 105.0)],
        );
        let b = chunk(
            1,
            90.0,
            200.0,
            vec![segment("straddle-b", 95.0, 105.0), segment("after", 150.0, 160.0)],
        );
        let merged = merger.merge_transcriptions(&[a, b]);
        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["before", "after"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let merger = TranscriptionMerger::default();
        assert!(merger.merge_transcriptions(&[]).is_empty());
    }

    #[test]
    fn full_text_joins_segments_with_spaces() {
        let segs = vec![segment("hello", 0.0, 1.0), segment("world", 1.0, 2.0)];
        assert_eq!(TranscriptionMerger::full_text(&segs), "hello world");
    }
}
