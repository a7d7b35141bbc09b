//! Component F — Speaker Aligner, grounded on
//! `original_source/src/diarizer.py::BaseDiarizer.assign_speakers_to_transcription`:
//! for each transcription segment, pick the speaker segment with the
//! largest time overlap; default to `UNKNOWN_SPEAKER` when no speaker
//! segment overlaps at all.

use crate::model::{LabeledSegment, SpeakerSegment, TranscriptionSegment, UNKNOWN_SPEAKER};

/// Assign a speaker label to each transcription segment by maximal time
/// overlap against the diarized speaker segments. Pure function: no I/O,
/// no backend dependency, per spec.md §4.F.
pub fn assign_speakers(
    transcription: &[TranscriptionSegment],
    speakers: &[SpeakerSegment],
) -> Vec<LabeledSegment> {
    transcription
        .iter()
        .map(|segment| {
            let mut best_speaker = UNKNOWN_SPEAKER.to_string();
            let mut max_overlap = 0.0_f64;
            for speaker_segment in speakers {
                let overlap = speaker_segment.overlap(segment.start_time, segment.end_time);
                if overlap > max_overlap {
                    max_overlap = overlap;
                    best_speaker = speaker_segment.speaker_id.clone();
                }
            }
            LabeledSegment {
                text: segment.text.clone(),
                start_time: segment.start_time,
                end_time: segment.end_time,
                speaker_id: best_speaker,
                confidence: segment.confidence,
                words: segment.words.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trans(text: &str, start: f64, end: f64) -> TranscriptionSegment {
        TranscriptionSegment {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            confidence: None,
            words: None,
        }
    }

    fn speaker(id: &str, start: f64, end: f64) -> SpeakerSegment {
        SpeakerSegment {
            speaker_id: id.to_string(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn picks_the_speaker_with_the_largest_overlap() {
        let transcription = vec![trans("hi", 10.0, 20.0)];
        let speakers = vec![
            speaker("SPEAKER_00", 0.0, 12.0),
            speaker("SPEAKER_01", 12.0, 25.0),
        ];
        let result = assign_speakers(&transcription, &speakers);
        assert_eq!(result[0].speaker_id, "SPEAKER_01");
    }

    #[test]
    fn no_overlapping_speaker_yields_unknown() {
        let transcription = vec![trans("hi", 100.0, 110.0)];
        let speakers = vec![speaker("SPEAKER_00", 0.0, 10.0)];
        let result = assign_speakers(&transcription, &speakers);
        assert_eq!(result[0].speaker_id, UNKNOWN_SPEAKER);
    }

    #[test]
    fn empty_speakers_yields_unknown_for_every_segment() {
        let transcription = vec![trans("a", 0.0, 1.0), trans("b", 1.0, 2.0)];
        let result = assign_speakers(&transcription, &[]);
        assert!(result.iter().all(|s| s.speaker_id == UNKNOWN_SPEAKER));
    }
}
