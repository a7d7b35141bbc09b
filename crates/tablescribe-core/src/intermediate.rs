//! Component N — Intermediate Output Manager, grounded on
//! `original_source/src/intermediate_output.py::IntermediateOutputManager`:
//! stage_4/5/6 JSON files under an `intermediates/` subdirectory wrapped in
//! a common metadata envelope, plus an NDJSON audit log of every
//! classification prompt/response appended one line at a time.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{Classification, LabeledSegment, TranscriptionSegment};

#[derive(Debug, thiserror::Error)]
pub enum IntermediateError {
    #[error("invalid stage number: {0} (expected 4, 5, or 6)")]
    InvalidStage(u8),

    #[error("stage {stage} output not found at {path}")]
    NotFound { stage: u8, path: String },

    #[error("invalid stage output format in {path}: {message}")]
    InvalidFormat { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn stage_name(stage_number: u8) -> Result<&'static str, IntermediateError> {
    match stage_number {
        4 => Ok("merged_transcript"),
        5 => Ok("diarization"),
        6 => Ok("classification"),
        other => Err(IntermediateError::InvalidStage(other)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetadata {
    pub session_id: String,
    pub stage: String,
    pub stage_number: u8,
    pub timestamp: chrono::DateTime<Utc>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StageEnvelope {
    metadata: StageMetadata,
    segments: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<serde_json::Value>,
}

/// Manages the `intermediates/` subdirectory of a session's output
/// directory: per-stage JSON snapshots and the classification audit log.
pub struct IntermediateOutputManager {
    session_id: String,
    intermediates_dir: PathBuf,
}

impl IntermediateOutputManager {
    pub fn new(session_output_dir: impl AsRef<Path>) -> Self {
        let session_output_dir = session_output_dir.as_ref();
        Self {
            session_id: session_output_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            intermediates_dir: session_output_dir.join("intermediates"),
        }
    }

    pub fn ensure_intermediates_dir(&self) -> Result<&Path, IntermediateError> {
        fs::create_dir_all(&self.intermediates_dir)?;
        Ok(&self.intermediates_dir)
    }

    pub fn stage_path(&self, stage_number: u8) -> Result<PathBuf, IntermediateError> {
        let name = stage_name(stage_number)?;
        Ok(self.intermediates_dir.join(format!("stage_{stage_number}_{name}.json")))
    }

    pub fn stage_output_exists(&self, stage_number: u8) -> bool {
        self.stage_path(stage_number).map(|p| p.exists()).unwrap_or(false)
    }

    fn save_stage_output(
        &self,
        stage_number: u8,
        segments: serde_json::Value,
        statistics: Option<serde_json::Value>,
        input_file: Option<&str>,
    ) -> Result<PathBuf, IntermediateError> {
        self.ensure_intermediates_dir()?;
        let stage = stage_name(stage_number)?;
        let segment_count = segments.as_array().map(|a| a.len()).unwrap_or(0);

        let envelope = StageEnvelope {
            metadata: StageMetadata {
                session_id: self.session_id.clone(),
                stage: stage.to_string(),
                stage_number,
                timestamp: Utc::now(),
                version: "1.0".to_string(),
                input_file: input_file.map(String::from),
                extra: serde_json::Map::new(),
            },
            segments,
            statistics,
        };

        let path = self.stage_path(stage_number)?;
        fs::write(&path, serde_json::to_vec_pretty(&envelope)?)?;
        tracing::info!(stage_number, stage, segments = segment_count, path = %path.display(), "saved stage output");
        Ok(path)
    }

    fn load_stage_output(&self, stage_number: u8) -> Result<(serde_json::Value, StageMetadata), IntermediateError> {
        let path = self.stage_path(stage_number)?;
        if !path.exists() {
            return Err(IntermediateError::NotFound {
                stage: stage_number,
                path: path.display().to_string(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        let envelope: StageEnvelope = serde_json::from_str(&raw).map_err(|e| IntermediateError::InvalidFormat {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok((envelope.segments, envelope.metadata))
    }

    /// Save Stage 4 (merged transcript) output.
    pub fn save_merged_transcript(
        &self,
        segments: &[TranscriptionSegment],
        input_file: Option<&str>,
    ) -> Result<PathBuf, IntermediateError> {
        let total_duration = segments.iter().map(|s| s.end_time).fold(0.0f64, f64::max);
        let statistics = serde_json::json!({
            "total_segments": segments.len(),
            "total_duration": total_duration,
        });
        self.save_stage_output(4, serde_json::to_value(segments)?, Some(statistics), input_file)
    }

    /// Save Stage 5 (diarization) output.
    pub fn save_diarization(
        &self,
        segments: &[LabeledSegment],
        input_file: Option<&str>,
    ) -> Result<PathBuf, IntermediateError> {
        let mut speaker_time: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        for segment in segments {
            *speaker_time.entry(segment.speaker_id.clone()).or_insert(0.0) += segment.duration();
        }
        let statistics = serde_json::json!({
            "unique_speakers": speaker_time.len(),
            "speaker_time": speaker_time,
            "total_segments": segments.len(),
        });
        self.save_stage_output(5, serde_json::to_value(segments)?, Some(statistics), input_file)
    }

    /// Save Stage 6 (IC/OOC classification) output: segments merged with
    /// their classification, one-to-one by index.
    pub fn save_classification(
        &self,
        segments: &[LabeledSegment],
        classifications: &[Classification],
        input_file: Option<&str>,
    ) -> Result<PathBuf, IntermediateError> {
        let merged: Vec<serde_json::Value> = segments
            .iter()
            .zip(classifications)
            .map(|(segment, classification)| {
                serde_json::json!({
                    "segment_index": classification.segment_index,
                    "text": segment.text,
                    "start_time": segment.start_time,
                    "end_time": segment.end_time,
                    "speaker": segment.speaker_id,
                    "classification": classification.classification,
                    "confidence": classification.confidence,
                    "reasoning": classification.reasoning,
                    "character": classification.character,
                })
            })
            .collect();

        let ic_count = classifications
            .iter()
            .filter(|c| c.classification == crate::model::ClassificationLabel::Ic)
            .count();
        let ooc_count = classifications
            .iter()
            .filter(|c| c.classification == crate::model::ClassificationLabel::Ooc)
            .count();
        let mixed_count = classifications
            .iter()
            .filter(|c| c.classification == crate::model::ClassificationLabel::Mixed)
            .count();
        let total = merged.len();
        let statistics = serde_json::json!({
            "total_segments": total,
            "ic_count": ic_count,
            "ooc_count": ooc_count,
            "mixed_count": mixed_count,
            "ic_percentage": if total > 0 { ic_count as f64 / total as f64 * 100.0 } else { 0.0 },
        });

        self.save_stage_output(6, serde_json::Value::Array(merged), Some(statistics), input_file)
    }

    pub fn load_merged_transcript(&self) -> Result<Vec<TranscriptionSegment>, IntermediateError> {
        let (segments, _) = self.load_stage_output(4)?;
        Ok(serde_json::from_value(segments)?)
    }

    pub fn load_diarization(&self) -> Result<Vec<LabeledSegment>, IntermediateError> {
        let (segments, _) = self.load_stage_output(5)?;
        Ok(serde_json::from_value(segments)?)
    }

    pub fn load_classification(&self) -> Result<(Vec<LabeledSegment>, Vec<Classification>), IntermediateError> {
        let (merged, _) = self.load_stage_output(6)?;
        let items = merged.as_array().cloned().unwrap_or_default();

        let mut segments = Vec::with_capacity(items.len());
        let mut classifications = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let segment_index = item
                .get("segment_index")
                .and_then(|v| v.as_u64())
                .unwrap_or(index as u64) as usize;

            segments.push(LabeledSegment {
                text: item.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                start_time: item.get("start_time").and_then(|v| v.as_f64()).unwrap_or(0.0),
                end_time: item.get("end_time").and_then(|v| v.as_f64()).unwrap_or(0.0),
                speaker_id: item
                    .get("speaker")
                    .and_then(|v| v.as_str())
                    .unwrap_or(crate::model::UNKNOWN_SPEAKER)
                    .to_string(),
                confidence: None,
                words: None,
            });

            classifications.push(Classification {
                segment_index,
                classification: item
                    .get("classification")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(crate::model::ClassificationLabel::Ic),
                confidence: item.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0),
                reasoning: item
                    .get("reasoning")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                character: item.get("character").and_then(|v| v.as_str()).map(String::from),
            });
        }

        Ok((segments, classifications))
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.intermediates_dir.join("stage_6_prompts.ndjson")
    }

    /// Append one NDJSON entry to the classification audit log. Each
    /// `append_audit_log` call performs exactly one `write_all`, matching
    /// the original's single-write-then-flush append.
    pub fn append_audit_log(&self, entry: &AuditEntry) -> Result<(), IntermediateError> {
        self.ensure_intermediates_dir()?;
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(self.audit_log_path())?;
        file.write_all(&line)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub segment_index: usize,
    pub timestamp: chrono::DateTime<Utc>,
    pub prompt_hash: String,
    pub response_hash: String,
    pub model: String,
    #[serde(default)]
    pub options: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_structure: Option<PromptStructure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptStructure {
    pub has_prev: bool,
    pub has_current: bool,
    pub has_next: bool,
    pub speaker_count: usize,
}

/// Build an audit entry for one classification call. When `redact` is
/// true, full prompt/response text is dropped in favor of a structural
/// summary; otherwise a 256-character preview of each is kept, matching
/// the original's truncated-preview behavior.
pub fn build_audit_entry(
    segment_index: usize,
    prompt_text: &str,
    response_text: &str,
    model: &str,
    options: serde_json::Value,
    retry_strategy: Option<String>,
    speaker_count: usize,
    redact: bool,
) -> AuditEntry {
    let preview = |s: &str| s.chars().take(256).collect::<String>();

    AuditEntry {
        segment_index,
        timestamp: Utc::now(),
        prompt_hash: hex_sha256(prompt_text),
        response_hash: hex_sha256(response_text),
        model: model.to_string(),
        options,
        retry_strategy,
        prompt_preview: if redact { None } else { Some(preview(prompt_text)) },
        response_preview: if redact { None } else { Some(preview(response_text)) },
        prompt_structure: if redact {
            Some(PromptStructure {
                has_prev: !prompt_text.is_empty(),
                has_current: !prompt_text.is_empty(),
                has_next: !prompt_text.is_empty(),
                speaker_count,
            })
        } else {
            None
        },
    }
}

fn hex_sha256(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassificationLabel;

    #[test]
    fn invalid_stage_number_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IntermediateOutputManager::new(dir.path());
        assert!(matches!(manager.stage_path(7), Err(IntermediateError::InvalidStage(7))));
    }

    #[test]
    fn merged_transcript_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IntermediateOutputManager::new(dir.path());
        let segments = vec![TranscriptionSegment {
            text: "hi".to_string(),
            start_time: 0.0,
            end_time: 1.5,
            confidence: Some(0.9),
            words: None,
        }];
        manager.save_merged_transcript(&segments, None).unwrap();

        let loaded = manager.load_merged_transcript().unwrap();
        assert_eq!(loaded, segments);
    }

    #[test]
    fn classification_round_trips_through_stage_6() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IntermediateOutputManager::new(dir.path());
        let segments = vec![LabeledSegment {
            text: "hi".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            speaker_id: "SPEAKER_00".to_string(),
            confidence: None,
            words: None,
        }];
        let classifications = vec![Classification {
            segment_index: 0,
            classification: ClassificationLabel::Ic,
            confidence: 0.8,
            reasoning: "r".to_string(),
            character: Some("Grog".to_string()),
        }];
        manager.save_classification(&segments, &classifications, None).unwrap();

        let (loaded_segments, loaded_classifications) = manager.load_classification().unwrap();
        assert_eq!(loaded_segments[0].text, "hi");
        assert_eq!(loaded_classifications[0].character, Some("Grog".to_string()));
    }

    #[test]
    fn audit_log_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IntermediateOutputManager::new(dir.path());
        let entry = build_audit_entry(0, "prompt", "response", "llama", serde_json::json!({}), None, 2, false);
        manager.append_audit_log(&entry).unwrap();
        manager.append_audit_log(&entry).unwrap();

        let contents = fs::read_to_string(manager.audit_log_path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let parsed: AuditEntry = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.model, "llama");
    }

    #[test]
    fn redacted_audit_entry_drops_previews() {
        let entry = build_audit_entry(0, "prompt", "response", "llama", serde_json::json!({}), None, 3, true);
        assert!(entry.prompt_preview.is_none());
        assert!(entry.prompt_structure.is_some());
    }

    #[test]
    fn loading_a_missing_stage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = IntermediateOutputManager::new(dir.path());
        assert!(matches!(
            manager.load_merged_transcript(),
            Err(IntermediateError::NotFound { stage: 4, .. })
        ));
    }
}
