//! The nine pipeline stages and their per-run status, grounded on
//! `original_source/src/constants.py`'s `PipelineStage`/`ProcessingStatus`
//! enums (referenced from `pipeline.py`, defined alongside the rest of the
//! project's shared enums).

use serde::{Deserialize, Serialize};

/// One of the nine ordered stages a session passes through. Numbered 1-9 to
/// match the `--from-stage` resume points and checkpoint file naming
/// (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    AudioConverted,
    AudioChunked,
    AudioTranscribed,
    TranscriptionMerged,
    SpeakerDiarized,
    SegmentsClassified,
    OutputsGenerated,
    AudioSegmentsExported,
    KnowledgeExtracted,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 9] = [
        PipelineStage::AudioConverted,
        PipelineStage::AudioChunked,
        PipelineStage::AudioTranscribed,
        PipelineStage::TranscriptionMerged,
        PipelineStage::SpeakerDiarized,
        PipelineStage::SegmentsClassified,
        PipelineStage::OutputsGenerated,
        PipelineStage::AudioSegmentsExported,
        PipelineStage::KnowledgeExtracted,
    ];

    /// 1-based stage number, used in checkpoint file names and the
    /// `--from-stage` CLI flag.
    pub fn number(self) -> u8 {
        match self {
            PipelineStage::AudioConverted => 1,
            PipelineStage::AudioChunked => 2,
            PipelineStage::AudioTranscribed => 3,
            PipelineStage::TranscriptionMerged => 4,
            PipelineStage::SpeakerDiarized => 5,
            PipelineStage::SegmentsClassified => 6,
            PipelineStage::OutputsGenerated => 7,
            PipelineStage::AudioSegmentsExported => 8,
            PipelineStage::KnowledgeExtracted => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::AudioConverted => "AUDIO_CONVERTED",
            PipelineStage::AudioChunked => "AUDIO_CHUNKED",
            PipelineStage::AudioTranscribed => "AUDIO_TRANSCRIBED",
            PipelineStage::TranscriptionMerged => "TRANSCRIPTION_MERGED",
            PipelineStage::SpeakerDiarized => "SPEAKER_DIARIZED",
            PipelineStage::SegmentsClassified => "SEGMENTS_CLASSIFIED",
            PipelineStage::OutputsGenerated => "OUTPUTS_GENERATED",
            PipelineStage::AudioSegmentsExported => "AUDIO_SEGMENTS_EXPORTED",
            PipelineStage::KnowledgeExtracted => "KNOWLEDGE_EXTRACTED",
        }
    }

    /// The stage resumable from `--from-stage {4|5|6}` per spec.md §6 maps
    /// onto `TranscriptionMerged` (4), `SpeakerDiarized` (5),
    /// `SegmentsClassified` (6) -- the only three points with a persisted
    /// intermediate JSON file.
    pub fn from_resume_number(n: u8) -> Option<PipelineStage> {
        PipelineStage::ALL.into_iter().find(|s| s.number() == n)
    }

    /// How a failure in this stage should be treated by the orchestrator
    /// (spec.md §4.M: critical stages abort the run, degradable stages
    /// continue with reduced features, optional stages are best-effort).
    pub fn failure_class(self) -> FailureClass {
        match self {
            PipelineStage::AudioConverted
            | PipelineStage::AudioChunked
            | PipelineStage::AudioTranscribed
            | PipelineStage::TranscriptionMerged => FailureClass::Critical,
            PipelineStage::SpeakerDiarized | PipelineStage::SegmentsClassified => {
                FailureClass::Degradable
            }
            PipelineStage::OutputsGenerated => FailureClass::Critical,
            PipelineStage::AudioSegmentsExported | PipelineStage::KnowledgeExtracted => {
                FailureClass::Optional
            }
        }
    }
}

/// How the orchestrator should react when a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Abort the run; nothing downstream can proceed without this stage.
    Critical,
    /// Log a warning, fall back to a reduced-feature result, and continue.
    Degradable,
    /// Log a warning and skip the stage's output entirely; the run still
    /// succeeds.
    Optional,
}

/// Per-run status of a single stage execution, mirroring
/// `original_source`'s `ProcessingStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_numbers_are_one_based_and_ordered() {
        for (idx, stage) in PipelineStage::ALL.iter().enumerate() {
            assert_eq!(stage.number(), (idx + 1) as u8);
        }
    }

    #[test]
    fn resume_numbers_map_to_the_three_documented_stages() {
        assert_eq!(
            PipelineStage::from_resume_number(4),
            Some(PipelineStage::TranscriptionMerged)
        );
        assert_eq!(
            PipelineStage::from_resume_number(5),
            Some(PipelineStage::SpeakerDiarized)
        );
        assert_eq!(
            PipelineStage::from_resume_number(6),
            Some(PipelineStage::SegmentsClassified)
        );
        assert_eq!(PipelineStage::from_resume_number(0), None);
    }

    #[test]
    fn diarization_and_classification_are_degradable() {
        assert_eq!(
            PipelineStage::SpeakerDiarized.failure_class(),
            FailureClass::Degradable
        );
        assert_eq!(
            PipelineStage::SegmentsClassified.failure_class(),
            FailureClass::Degradable
        );
    }

    #[test]
    fn export_and_knowledge_are_optional() {
        assert_eq!(
            PipelineStage::AudioSegmentsExported.failure_class(),
            FailureClass::Optional
        );
        assert_eq!(
            PipelineStage::KnowledgeExtracted.failure_class(),
            FailureClass::Optional
        );
    }
}
