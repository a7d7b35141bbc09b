//! Component L — Checkpoint Store, grounded on
//! `original_source/src/checkpoint.py::CheckpointManager` (`_stage_path`,
//! `list_stages` via glob, `latest` via mtime, `clear` via rmtree), with one
//! addition: the original inlines `data` directly into the checkpoint JSON,
//! but here the payload is written to a separate gzip-compressed blob
//! sidecar, compressed with `flate2`, so large intermediate payloads don't
//! bloat the human-readable checkpoint record.

pub mod error;

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

pub use error::CheckpointError;

const RECORD_PREFIX: &str = "checkpoint_";
const RECORD_SUFFIX: &str = ".json";
const BLOB_SUFFIX: &str = ".blob.gz";

/// Serializable checkpoint metadata stored on disk. The bulk payload lives
/// in a separate blob sidecar, referenced here by file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub session_id: String,
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub completed_stages: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub blob_file: String,
}

pub struct CheckpointStore {
    session_id: String,
    checkpoint_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(session_id: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let checkpoint_dir = storage_dir.into();
        fs::create_dir_all(&checkpoint_dir)?;
        Ok(Self {
            session_id: session_id.into(),
            checkpoint_dir,
        })
    }

    fn safe_stage(stage: &str) -> String {
        stage.replace('/', "_")
    }

    fn record_path(&self, stage: &str) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{RECORD_PREFIX}{}{RECORD_SUFFIX}", Self::safe_stage(stage)))
    }

    fn blob_path(&self, stage: &str) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{RECORD_PREFIX}{}{BLOB_SUFFIX}", Self::safe_stage(stage)))
    }

    /// Persist a checkpoint for `stage`: `data` is gzip-compressed into a
    /// blob sidecar, and a small JSON record referencing it is written
    /// alongside.
    pub fn save(
        &self,
        stage: &str,
        data: &serde_json::Value,
        completed_stages: &[String],
        metadata: serde_json::Value,
    ) -> Result<PathBuf, CheckpointError> {
        let blob_path = self.blob_path(stage);
        let mut encoder = GzEncoder::new(fs::File::create(&blob_path)?, Compression::default());
        encoder.write_all(&serde_json::to_vec(data)?)?;
        encoder.finish()?;

        let record = CheckpointRecord {
            session_id: self.session_id.clone(),
            stage: stage.to_string(),
            timestamp: Utc::now(),
            completed_stages: completed_stages.to_vec(),
            metadata,
            blob_file: blob_path
                .file_name()
                .expect("blob path always has a file name")
                .to_string_lossy()
                .into_owned(),
        };

        let record_path = self.record_path(stage);
        fs::write(&record_path, serde_json::to_vec_pretty(&record)?)?;
        tracing::info!(stage, path = %record_path.display(), "checkpoint saved");
        Ok(record_path)
    }

    /// Load the record and decompressed payload for `stage`, if present.
    pub fn load(&self, stage: &str) -> Result<Option<(CheckpointRecord, serde_json::Value)>, CheckpointError> {
        let record_path = self.record_path(stage);
        if !record_path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&record_path)?;
        let record: CheckpointRecord = serde_json::from_str(&raw)?;

        let blob_path = self.checkpoint_dir.join(&record.blob_file);
        if !blob_path.exists() {
            return Err(CheckpointError::Corrupt {
                stage: stage.to_string(),
                message: format!("referenced blob file missing: {}", blob_path.display()),
            });
        }

        let mut decoder = GzDecoder::new(fs::File::open(&blob_path)?);
        let mut decompressed = String::new();
        decoder.read_to_string(&mut decompressed)?;
        let data = serde_json::from_str(&decompressed)?;

        Ok(Some((record, data)))
    }

    /// Returns true only if both the record file and its referenced blob
    /// exist — the "referenced blob still present on disk" half of resume's
    /// three-condition check (spec.md §9).
    pub fn has_checkpoint(&self, stage: &str) -> bool {
        self.load(stage).map(|r| r.is_some()).unwrap_or(false)
    }

    pub fn list_stages(&self) -> Result<Vec<String>, CheckpointError> {
        let mut stages = Vec::new();
        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(stripped) = name
                .strip_prefix(RECORD_PREFIX)
                .and_then(|s| s.strip_suffix(RECORD_SUFFIX))
            {
                stages.push(stripped.to_string());
            }
        }
        stages.sort();
        Ok(stages)
    }

    /// Return the `(stage, record)` with the most recently modified record
    /// file, matching the original's mtime-based `latest()`.
    pub fn latest(&self) -> Result<Option<(String, CheckpointRecord)>, CheckpointError> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in fs::read_dir(&self.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            if !name.starts_with(RECORD_PREFIX) || !name.ends_with(RECORD_SUFFIX) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                newest = Some((modified, path));
            }
        }

        let Some((_, path)) = newest else {
            return Ok(None);
        };
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();
        let stage = file_name
            .strip_prefix(RECORD_PREFIX)
            .and_then(|s| s.strip_suffix(RECORD_SUFFIX))
            .unwrap_or_default()
            .to_string();

        match self.load(&stage)? {
            Some((record, _)) => Ok(Some((stage, record))),
            None => Ok(None),
        }
    }

    /// Remove every checkpoint file for this session and recreate the
    /// (now empty) directory.
    pub fn clear(&self) -> Result<(), CheckpointError> {
        if self.checkpoint_dir.exists() {
            fs::remove_dir_all(&self.checkpoint_dir)?;
        }
        fs::create_dir_all(&self.checkpoint_dir)?;
        tracing::info!(session_id = %self.session_id, "checkpoints cleared");
        Ok(())
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_round_trips_through_the_gzip_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new("session-1", dir.path()).unwrap();

        let data = serde_json::json!({"transcript": "hello world", "segments": 42});
        store
            .save("4_transcribed", &data, &["1_transcoded".to_string()], serde_json::json!({}))
            .unwrap();

        let (record, loaded) = store.load("4_transcribed").unwrap().unwrap();
        assert_eq!(record.stage, "4_transcribed");
        assert_eq!(record.completed_stages, vec!["1_transcoded".to_string()]);
        assert_eq!(loaded, data);
    }

    #[test]
    fn has_checkpoint_is_false_when_blob_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new("session-1", dir.path()).unwrap();
        store
            .save("4_transcribed", &serde_json::json!({}), &[], serde_json::json!({}))
            .unwrap();

        fs::remove_file(dir.path().join("checkpoint_4_transcribed.blob.gz")).unwrap();
        assert!(!store.has_checkpoint("4_transcribed"));
    }

    #[test]
    fn list_stages_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new("session-1", dir.path()).unwrap();
        store
            .save("6_classified", &serde_json::json!({}), &[], serde_json::json!({}))
            .unwrap();
        store
            .save("4_transcribed", &serde_json::json!({}), &[], serde_json::json!({}))
            .unwrap();

        assert_eq!(store.list_stages().unwrap(), vec!["4_transcribed", "6_classified"]);
    }

    #[test]
    fn latest_picks_the_most_recently_saved_stage() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new("session-1", dir.path()).unwrap();
        store
            .save("4_transcribed", &serde_json::json!({}), &[], serde_json::json!({}))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        store
            .save("5_diarized", &serde_json::json!({}), &[], serde_json::json!({}))
            .unwrap();

        let (stage, _) = store.latest().unwrap().unwrap();
        assert_eq!(stage, "5_diarized");
    }

    #[test]
    fn clear_removes_every_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new("session-1", dir.path()).unwrap();
        store
            .save("4_transcribed", &serde_json::json!({}), &[], serde_json::json!({}))
            .unwrap();
        store.clear().unwrap();
        assert!(store.list_stages().unwrap().is_empty());
    }
}
