//! Offloaded classifier backend, grounded on
//! `original_source/src/classifier.py::ColabClassifier`: rather than
//! calling an LLM directly, a job file is written to a `pending` directory
//! for an external worker to pick up, and the result is read back from a
//! `complete` directory once it appears. The Drive-mount auto-detection
//! from the original is not carried over — here the two directories are
//! configured directly, since the mount-resolution heuristics are specific
//! to Google Drive/Colab rather than to the offload protocol itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::Classification;
use crate::preflight::{PreflightIssue, SupportsPreflight};

use super::error::ClassificationError;
use super::prompt;
use super::Classifier;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Serialize)]
struct JobFile {
    job_id: String,
    segments: Vec<SegmentText>,
    character_names: Vec<String>,
    player_names: Vec<String>,
    prompt_template: String,
}

#[derive(Serialize)]
struct SegmentText {
    text: String,
}

#[derive(Deserialize)]
struct ResultFile {
    classifications: Vec<Classification>,
}

pub struct OffloadedClassifier {
    pending_dir: PathBuf,
    complete_dir: PathBuf,
    prompt_template: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl OffloadedClassifier {
    pub fn new(pending_dir: impl Into<PathBuf>, complete_dir: impl Into<PathBuf>) -> Self {
        Self {
            pending_dir: pending_dir.into(),
            complete_dir: complete_dir.into(),
            prompt_template: prompt::DEFAULT_TEMPLATE_EN.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn job_id(&self) -> String {
        let suffix: u64 = rand::thread_rng().gen();
        format!("job_{suffix:016x}")
    }

    fn poll_for_result(&self, result_path: &Path, deadline: Instant) -> Result<ResultFile, ClassificationError> {
        loop {
            if Instant::now() >= deadline {
                let elapsed = self.timeout.as_secs_f64();
                tracing::error!(elapsed_secs = elapsed, "offloaded classification job timed out");
                return Err(ClassificationError::Timeout { elapsed_secs: elapsed });
            }

            if result_path.exists() {
                let raw = fs::read_to_string(result_path)?;
                return Ok(serde_json::from_str(&raw)?);
            }

            std::thread::sleep(self.poll_interval);
        }
    }
}

impl SupportsPreflight for OffloadedClassifier {
    fn preflight_check(&self) -> Vec<PreflightIssue> {
        let mut issues = Vec::new();
        if !self.pending_dir.exists() {
            issues.push(PreflightIssue::error(
                "classifier.offloaded",
                format!(
                    "pending directory not found: {}. Ensure the offload mount is attached.",
                    self.pending_dir.display()
                ),
            ));
        }
        if !self.complete_dir.exists() {
            issues.push(PreflightIssue::error(
                "classifier.offloaded",
                format!(
                    "complete directory not found: {}. Ensure the offload mount is attached.",
                    self.complete_dir.display()
                ),
            ));
        }
        issues
    }
}

impl Classifier for OffloadedClassifier {
    fn name(&self) -> &'static str {
        "offloaded"
    }

    fn classify_segments(
        &self,
        texts: &[String],
        character_names: &[String],
        player_names: &[String],
    ) -> Result<Vec<Classification>, ClassificationError> {
        let job_id = self.job_id();
        let job_path = self.pending_dir.join(format!("{job_id}.json"));
        let result_path = self.complete_dir.join(format!("{job_id}_result.json"));

        let job = JobFile {
            job_id: job_id.clone(),
            segments: texts.iter().map(|t| SegmentText { text: t.clone() }).collect(),
            character_names: character_names.to_vec(),
            player_names: player_names.to_vec(),
            prompt_template: self.prompt_template.clone(),
        };

        tracing::info!(job_id = %job_id, "uploading offloaded classification job");
        fs::write(&job_path, serde_json::to_vec_pretty(&job)?)?;

        tracing::info!(
            job_id = %job_id,
            poll_interval_secs = self.poll_interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            "waiting for offloaded classification result"
        );
        let deadline = Instant::now() + self.timeout;
        let result = self.poll_for_result(&result_path, deadline)?;

        if let Err(cleanup_err) = fs::remove_file(&job_path) {
            tracing::warn!(job_id = %job_id, error = %cleanup_err, "could not clean up job file");
        }
        if let Err(cleanup_err) = fs::remove_file(&result_path) {
            tracing::warn!(job_id = %job_id, error = %cleanup_err, "could not clean up result file");
        }

        Ok(result.classifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn missing_directories_are_preflight_errors() {
        let classifier = OffloadedClassifier::new("/nonexistent/pending", "/nonexistent/complete");
        let issues = classifier.preflight_check();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.is_error()));
    }

    #[test]
    fn reads_result_once_worker_writes_it() {
        let pending = tempfile::tempdir().unwrap();
        let complete = tempfile::tempdir().unwrap();
        let classifier = OffloadedClassifier::new(pending.path(), complete.path())
            .with_poll_interval(Duration::from_millis(20))
            .with_timeout(Duration::from_secs(5));

        let complete_path = complete.path().to_path_buf();
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::spawn(move || {
            // Wait for the job file to appear, then emulate an external
            // worker writing the matching result file.
            let job_path: PathBuf = rx.recv().unwrap();
            let job_id = job_path.file_stem().unwrap().to_str().unwrap().to_string();
            let result_path = complete_path.join(format!("{job_id}_result.json"));
            let payload = serde_json::json!({
                "classifications": [{
                    "segment_index": 0,
                    "classification": "IC",
                    "confidence": 0.9,
                    "reasoning": "worker said so",
                    "character": null,
                }]
            });
            std::thread::sleep(Duration::from_millis(50));
            fs::write(result_path, serde_json::to_vec(&payload).unwrap()).unwrap();
        });

        // Find the job file the classifier writes, and hand its path to the worker.
        let pending_path = pending.path().to_path_buf();
        let finder = std::thread::spawn(move || loop {
            if let Ok(mut entries) = fs::read_dir(&pending_path) {
                if let Some(entry) = entries.next() {
                    tx.send(entry.unwrap().path()).unwrap();
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(5));
        });

        let results = classifier
            .classify_segments(&["hello".to_string()], &[], &[])
            .unwrap();
        finder.join().unwrap();
        worker.join().unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reasoning, "worker said so");
    }

    #[test]
    fn timeout_is_reported_with_elapsed_seconds() {
        let pending = tempfile::tempdir().unwrap();
        let complete = tempfile::tempdir().unwrap();
        let classifier = OffloadedClassifier::new(pending.path(), complete.path())
            .with_poll_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_millis(30));

        let err = classifier
            .classify_segments(&["hello".to_string()], &[], &[])
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Timeout { .. }));
    }
}
