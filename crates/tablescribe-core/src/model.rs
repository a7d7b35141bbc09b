//! Shared data model types that flow between pipeline stages (§3 of the spec).
//!
//! These are plain data: owned by whichever stage produced them until a later
//! stage consumes them, exactly as spec.md §3 describes ownership.

use serde::{Deserialize, Serialize};

use crate::util::sanitize_filename;

/// A single recognized word inside a [`TranscriptionSegment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub probability: f64,
}

/// A unit of transcribed text with an absolute-timeline interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl TranscriptionSegment {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// All segments produced by transcribing one [`crate::audio::AudioChunk`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkTranscription {
    pub chunk_index: usize,
    pub chunk_start: f64,
    pub chunk_end: f64,
    pub segments: Vec<TranscriptionSegment>,
    pub language: String,
}

/// An opaque speaker-identity interval produced by diarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker_id: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl SpeakerSegment {
    /// Overlap (in seconds) between this interval and `[start, end)`.
    pub fn overlap(&self, start: f64, end: f64) -> f64 {
        (self.end_time.min(end) - self.start_time.max(start)).max(0.0)
    }
}

/// Speaker label used when no speaker segment overlaps a transcription segment.
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

/// A transcription segment after speaker assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSegment {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub speaker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

impl LabeledSegment {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// The speaker id sanitized for use in a filename.
    pub fn safe_speaker(&self) -> String {
        sanitize_filename(&self.speaker_id)
    }
}

/// IC / OOC / MIXED classification tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationLabel {
    #[serde(rename = "IC")]
    Ic,
    #[serde(rename = "OOC")]
    Ooc,
    #[serde(rename = "MIXED")]
    Mixed,
}

impl ClassificationLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ic => "IC",
            Self::Ooc => "OOC",
            Self::Mixed => "MIXED",
        }
    }
}

impl std::fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClassificationLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "IC" => Ok(Self::Ic),
            "OOC" => Ok(Self::Ooc),
            "MIXED" => Ok(Self::Mixed),
            other => Err(format!("unknown classification label: {other}")),
        }
    }
}

/// Result of classifying one [`LabeledSegment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub segment_index: usize,
    pub classification: ClassificationLabel,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
}

impl Classification {
    /// Clamp confidence into `[0, 1]`, as required by spec.md's testable
    /// property 4.
    pub fn clamp_confidence(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }

    pub fn default_ic(segment_index: usize, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            segment_index,
            classification: ClassificationLabel::Ic,
            confidence,
            reasoning: reasoning.into(),
            character: None,
        }
    }
}

/// Which classification labels a formatter/exporter pass should keep.
///
/// `IcOnly` and `OocOnly` both retain `Mixed` segments — this is an
/// intentional backward-compatibility rule, not a bug (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFilter {
    All,
    IcOnly,
    OocOnly,
    MixedOnly,
}

impl TranscriptFilter {
    pub fn keeps(&self, label: ClassificationLabel) -> bool {
        match self {
            Self::All => true,
            Self::IcOnly => matches!(label, ClassificationLabel::Ic | ClassificationLabel::Mixed),
            Self::OocOnly => matches!(label, ClassificationLabel::Ooc | ClassificationLabel::Mixed),
            Self::MixedOnly => matches!(label, ClassificationLabel::Mixed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_backward_compat_includes_mixed() {
        assert!(TranscriptFilter::IcOnly.keeps(ClassificationLabel::Mixed));
        assert!(TranscriptFilter::OocOnly.keeps(ClassificationLabel::Mixed));
        assert!(!TranscriptFilter::IcOnly.keeps(ClassificationLabel::Ooc));
        assert!(!TranscriptFilter::OocOnly.keeps(ClassificationLabel::Ic));
        assert!(TranscriptFilter::MixedOnly.keeps(ClassificationLabel::Mixed));
        assert!(!TranscriptFilter::MixedOnly.keeps(ClassificationLabel::Ic));
    }

    #[test]
    fn classification_confidence_clamps() {
        let c = Classification {
            segment_index: 0,
            classification: ClassificationLabel::Ic,
            confidence: 1.4,
            reasoning: "x".into(),
            character: None,
        }
        .clamp_confidence();
        assert_eq!(c.confidence, 1.0);

        let c = Classification {
            segment_index: 0,
            classification: ClassificationLabel::Ic,
            confidence: -0.2,
            reasoning: "x".into(),
            character: None,
        }
        .clamp_confidence();
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn speaker_segment_overlap() {
        let s = SpeakerSegment {
            speaker_id: "SPEAKER_00".into(),
            start_time: 10.0,
            end_time: 20.0,
        };
        assert_eq!(s.overlap(15.0, 25.0), 5.0);
        assert_eq!(s.overlap(21.0, 25.0), 0.0);
        assert_eq!(s.overlap(0.0, 30.0), 10.0);
    }

    #[test]
    fn label_round_trips_through_str() {
        for label in [
            ClassificationLabel::Ic,
            ClassificationLabel::Ooc,
            ClassificationLabel::Mixed,
        ] {
            let parsed: ClassificationLabel = label.as_str().parse().unwrap();
            assert_eq!(parsed, label);
        }
    }
}
