//! Component J — Streaming Snippet Exporter, grounded on
//! `original_source/src/snipper.py::AudioSnipper`: one FFmpeg streaming
//! extraction per segment (no whole-file load), a manifest read-modify-write
//! cycle guarded by a writer lock, and a `no_snippets` placeholder manifest
//! written (with stale clips removed) when there are no segments to export.
//!
//! The writer lock is a plain `std::sync::Mutex<()>` — spec.md §5 specifies
//! no reader lock, only serialized writers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::audio::error::AudioError;
use crate::audio::transcoder::Transcoder;
use crate::model::{Classification, LabeledSegment};
use crate::util::sanitize_filename;

const PLACEHOLDER_MESSAGE: &str =
    "No transcription segments were produced for this session; no audio clips were exported.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipEntry {
    pub id: usize,
    pub file: String,
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub status: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClipClassification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipClassification {
    pub label: String,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderInfo {
    pub message: String,
    pub reason: String,
    pub removed_clips: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub session_id: String,
    pub status: String,
    pub total_clips: usize,
    pub clips: Vec<ClipEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderInfo>,
}

/// Exports per-segment audio clips alongside a JSON manifest describing
/// them, serializing all manifest writes through a single lock.
pub struct SnippetExporter {
    transcoder: Transcoder,
    clean_stale_clips: bool,
    manifest_lock: Mutex<()>,
}

impl SnippetExporter {
    pub fn new(transcoder: Transcoder) -> Self {
        Self {
            transcoder,
            clean_stale_clips: true,
            manifest_lock: Mutex::new(()),
        }
    }

    pub fn with_clean_stale_clips(mut self, clean: bool) -> Self {
        self.clean_stale_clips = clean;
        self
    }

    fn manifest_path(session_dir: &Path) -> PathBuf {
        session_dir.join("manifest.json")
    }

    /// Remove any `*.wav` clips, placeholder artifacts, and stale manifest
    /// from a previous run. Returns the number of clips removed.
    fn clear_session_directory(&self, session_dir: &Path) -> usize {
        if !session_dir.exists() {
            return 0;
        }

        let mut removed = 0;
        if let Ok(entries) = fs::read_dir(session_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("wav") {
                    if fs::remove_file(&path).is_ok() {
                        removed += 1;
                    } else {
                        tracing::warn!(path = %path.display(), "failed to remove stale clip");
                    }
                }
            }
        }

        for artifact in ["keep.txt", "placeholder.txt"] {
            let artifact_path = session_dir.join(artifact);
            if artifact_path.exists() {
                let _ = fs::remove_file(&artifact_path);
            }
        }

        let manifest_path = Self::manifest_path(session_dir);
        if manifest_path.exists() {
            let _ = fs::remove_file(&manifest_path);
        }

        removed
    }

    fn initialize_manifest(&self, session_dir: &Path) -> Result<PathBuf, AudioError> {
        fs::create_dir_all(session_dir)?;
        let manifest_path = Self::manifest_path(session_dir);
        let _guard = self.manifest_lock.lock().expect("manifest lock poisoned");

        if self.clean_stale_clips {
            self.clear_session_directory(session_dir);
        }

        let manifest = Manifest {
            session_id: session_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            status: "in_progress".to_string(),
            total_clips: 0,
            clips: Vec::new(),
            placeholder: None,
        };
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
        Ok(manifest_path)
    }

    fn append_clip(&self, manifest_path: &Path, clip: ClipEntry) -> Result<(), AudioError> {
        let _guard = self.manifest_lock.lock().expect("manifest lock poisoned");
        let raw = fs::read_to_string(manifest_path)?;
        let mut manifest: Manifest = serde_json::from_str(&raw)?;
        manifest.clips.push(clip);
        manifest.total_clips = manifest.clips.len();
        fs::write(manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
        Ok(())
    }

    fn mark_complete(&self, manifest_path: &Path) -> Result<(), AudioError> {
        let _guard = self.manifest_lock.lock().expect("manifest lock poisoned");
        let raw = fs::read_to_string(manifest_path)?;
        let mut manifest: Manifest = serde_json::from_str(&raw)?;
        manifest.status = "complete".to_string();
        fs::write(manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
        Ok(())
    }

    /// Extract one segment's audio clip and append its entry to the manifest.
    fn export_one(
        &self,
        audio_path: &Path,
        segment: &LabeledSegment,
        index: usize,
        session_dir: &Path,
        manifest_path: &Path,
        classification: Option<&Classification>,
    ) -> Result<(), AudioError> {
        let start = segment.start_time.max(0.0);
        let end = (segment.end_time.max(start) - start).max(0.01) + start;

        let safe_speaker = {
            let s = sanitize_filename(&segment.speaker_id);
            if s.is_empty() {
                "UNKNOWN".to_string()
            } else {
                s
            }
        };
        let filename = format!("segment_{index:04}_{safe_speaker}.wav");
        let clip_path = session_dir.join(&filename);

        self.transcoder.extract_range(audio_path, &clip_path, start, end)?;

        let clip = ClipEntry {
            id: index,
            file: filename,
            speaker: segment.speaker_id.clone(),
            start,
            end,
            status: "ready".to_string(),
            text: segment.text.clone(),
            classification: classification.map(|c| ClipClassification {
                label: c.classification.as_str().to_string(),
                confidence: c.confidence,
                reasoning: c.reasoning.clone(),
                character: c.character.clone(),
            }),
        };
        self.append_clip(manifest_path, clip)
    }

    /// Export every segment's audio clip, writing a manifest alongside them.
    /// If `segments` is empty, any stale clips for the session are removed
    /// and a `no_snippets` placeholder manifest is written in their place.
    pub fn export_segments(
        &self,
        audio_path: &Path,
        segments: &[LabeledSegment],
        base_output_dir: &Path,
        session_id: &str,
        classifications: &[Classification],
    ) -> Result<Option<PathBuf>, AudioError> {
        let session_dir = base_output_dir.join(session_id);

        if segments.is_empty() {
            let _guard = self.manifest_lock.lock().expect("manifest lock poisoned");
            let removed = if self.clean_stale_clips {
                self.clear_session_directory(&session_dir)
            } else {
                0
            };
            if removed == 0 {
                tracing::warn!(session_id, "no transcription segments provided; no new snippet manifest created");
                return Ok(None);
            }

            fs::create_dir_all(&session_dir)?;
            let manifest_path = Self::manifest_path(&session_dir);
            let manifest = Manifest {
                session_id: session_id.to_string(),
                status: "no_snippets".to_string(),
                total_clips: 0,
                clips: Vec::new(),
                placeholder: Some(PlaceholderInfo {
                    message: PLACEHOLDER_MESSAGE.to_string(),
                    reason: "no_segments".to_string(),
                    removed_clips: removed,
                }),
            };
            fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
            tracing::info!(session_id, removed, "wrote no_snippets placeholder manifest");
            return Ok(Some(manifest_path));
        }

        let manifest_path = self.initialize_manifest(&session_dir)?;
        tracing::info!(session_id, count = segments.len(), "exporting audio snippets");

        for (i, segment) in segments.iter().enumerate() {
            let index = i + 1;
            self.export_one(
                audio_path,
                segment,
                index,
                &session_dir,
                &manifest_path,
                classifications.get(i),
            )?;
        }

        self.mark_complete(&manifest_path)?;
        tracing::info!(session_id, clips = segments.len(), "snippet export complete");
        Ok(Some(manifest_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassificationLabel;

    fn sample_segment() -> LabeledSegment {
        LabeledSegment {
            text: "hello".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            speaker_id: "SPEAKER_00".to_string(),
            confidence: None,
            words: None,
        }
    }

    #[test]
    fn empty_segments_with_no_stale_clips_writes_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = SnippetExporter::new(Transcoder::with_binary("ffmpeg"));
        let result = exporter
            .export_segments(Path::new("in.wav"), &[], dir.path(), "s1", &[])
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn empty_segments_with_stale_clips_writes_placeholder_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let session_dir = dir.path().join("s1");
        fs::create_dir_all(&session_dir).unwrap();
        fs::write(session_dir.join("segment_0001_SPEAKER_00.wav"), b"stale").unwrap();

        let exporter = SnippetExporter::new(Transcoder::with_binary("ffmpeg"));
        let manifest_path = exporter
            .export_segments(Path::new("in.wav"), &[], dir.path(), "s1", &[])
            .unwrap()
            .unwrap();

        let manifest: Manifest = serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
        assert_eq!(manifest.status, "no_snippets");
        assert_eq!(manifest.placeholder.unwrap().removed_clips, 1);
        assert!(!session_dir.join("segment_0001_SPEAKER_00.wav").exists());
    }

    #[test]
    fn classification_entries_carry_through_to_clip_manifest() {
        let classification = Classification {
            segment_index: 0,
            classification: ClassificationLabel::Ic,
            confidence: 0.9,
            reasoning: "r".to_string(),
            character: Some("Grog".to_string()),
        };
        let clip = ClipEntry {
            id: 1,
            file: "segment_0001_SPEAKER_00.wav".to_string(),
            speaker: "SPEAKER_00".to_string(),
            start: 0.0,
            end: 1.0,
            status: "ready".to_string(),
            text: "hello".to_string(),
            classification: Some(ClipClassification {
                label: classification.classification.as_str().to_string(),
                confidence: classification.confidence,
                reasoning: classification.reasoning.clone(),
                character: classification.character.clone(),
            }),
        };
        let json = serde_json::to_string(&clip).unwrap();
        assert!(json.contains("Grog"));
    }

    #[test]
    fn manifest_path_is_scoped_to_the_session_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = SnippetExporter::manifest_path(&dir.path().join("s1"));
        assert_eq!(path.file_name().unwrap(), "manifest.json");
    }

    #[test]
    fn safe_speaker_is_never_empty() {
        let mut segment = sample_segment();
        segment.speaker_id = "!!!".to_string();
        assert_eq!(sanitize_filename(&segment.speaker_id), "UNKNOWN");
    }
}
