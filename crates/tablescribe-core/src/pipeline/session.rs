//! Per-run session configuration, grounded on
//! `original_source/src/pipeline.py::DDSessionProcessor.__init__` and
//! `.process`.

use std::path::PathBuf;

use crate::pipeline::stage::PipelineStage;
use crate::util::sanitize_filename;

/// Static configuration for one session run (constructor args on the
/// original `DDSessionProcessor`).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub session_id: String,
    pub campaign_id: Option<String>,
    pub character_names: Vec<String>,
    pub player_names: Vec<String>,
    pub num_speakers: usize,
    pub party_id: Option<String>,
    pub language: String,
    pub resume_enabled: bool,
    pub transcription_backend: String,
    pub diarization_backend: String,
    pub classification_backend: String,
}

impl SessionConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            campaign_id: None,
            character_names: Vec::new(),
            player_names: Vec::new(),
            num_speakers: 4,
            party_id: None,
            language: "en".to_string(),
            resume_enabled: true,
            transcription_backend: "whisper".to_string(),
            diarization_backend: "pyannote".to_string(),
            classification_backend: "ollama".to_string(),
        }
    }

    /// Filesystem-safe session id, logged once with a warning if it had to
    /// be sanitized.
    pub fn safe_session_id(&self) -> String {
        sanitize_filename(&self.session_id)
    }
}

/// Per-invocation flags controlling which optional/degradable stages run
/// (`process(skip_diarization=..., skip_classification=..., ...)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipFlags {
    pub skip_diarization: bool,
    pub skip_classification: bool,
    pub skip_snippets: bool,
    pub skip_knowledge: bool,
}

/// Arguments to a single `process()` call: the source audio and where to
/// write outputs.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub skip: SkipFlags,
    pub is_test_run: bool,
    /// Explicit `--from-stage {4|5|6}` entry point: re-enter the pipeline at
    /// this stage, loading the prior stages' output from the intermediate
    /// output directory rather than re-running them. `None` runs the full
    /// pipeline from stage 1, subject to automatic checkpoint-based resume.
    pub resume_from: Option<PipelineStage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_with_spaces_is_sanitized() {
        let config = SessionConfig::new("Session One: Arrival!");
        assert_eq!(config.safe_session_id(), "Session_One_Arrival");
    }

    #[test]
    fn defaults_match_original_backend_names() {
        let config = SessionConfig::new("s1");
        assert_eq!(config.transcription_backend, "whisper");
        assert_eq!(config.diarization_backend, "pyannote");
        assert_eq!(config.classification_backend, "ollama");
        assert_eq!(config.num_speakers, 4);
    }
}
