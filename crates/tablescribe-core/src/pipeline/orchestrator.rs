//! Component M — Pipeline Orchestrator.
//!
//! Drives one session through the nine stages in order, wiring together
//! every other component. Grounded on
//! `original_source/src/pipeline.py::DDSessionProcessor.process` for the
//! overall stage sequencing and exception-classification-per-stage shape,
//! and on its `_should_skip_stage`/`_load_stage_from_checkpoint`/
//! `_reconstruct_chunks_from_checkpoint` trio (pipeline.py:1398-1502) for the
//! automatic checkpoint-resume mechanism implemented here via
//! [`CheckpointStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::audio::chunker::{self, ChunkerConfig};
use crate::audio::transcoder::peak_normalize;
use crate::audio::types::{AudioChunk, AudioChunkMeta};
use crate::audio::vad::VoiceActivityDetector;
use crate::audio::{AudioError, Transcoder};
use crate::alignment::assign_speakers;
use crate::checkpoint::CheckpointStore;
use crate::classification::Classifier;
use crate::diarization::DiarizationBackend;
use crate::error::TablescribeError;
use crate::formatter::{self, FormatPaths, SessionStatistics};
use crate::intermediate::{build_audit_entry, IntermediateOutputManager};
use crate::knowledge::{KnowledgeBase, KnowledgeExtractor};
use crate::model::{ChunkTranscription, Classification, LabeledSegment, TranscriptionSegment};
use crate::pipeline::session::{ProcessRequest, SessionConfig};
use crate::pipeline::stage::{PipelineStage, StageStatus};
use crate::pipeline::StageResult;
use crate::preflight;
use crate::snippet::SnippetExporter;
use crate::status::{StatusTracker, StatusUpdate};
use crate::transcription::TranscriptionBackend;

/// Checked at each stage boundary, never mid-stage (spec.md §6: "observed at
/// stage boundaries", not signal-driven).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("preflight checks failed: {0}")]
    Preflight(String),

    #[error("pipeline cancelled before stage {0}")]
    Cancelled(&'static str),

    #[error("critical stage {stage} failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: TablescribeError,
    },
}

/// Everything produced by one complete (or partially skipped) run.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_dir: PathBuf,
    pub segments: Vec<LabeledSegment>,
    pub classifications: Vec<Classification>,
    pub statistics: SessionStatistics,
    pub formats: Option<FormatPaths>,
    pub snippet_manifest: Option<PathBuf>,
    pub knowledge: Option<KnowledgeBase>,
    pub stage_results: Vec<StageResult>,
}

/// The checkpoint record key for `stage`: `"{number}_{lowercase name}"`,
/// e.g. `"4_transcription_merged"`.
fn stage_key(stage: PipelineStage) -> String {
    format!("{}_{}", stage.number(), stage.name().to_lowercase())
}

/// A stage is skipped via the checkpoint mechanism only when resume is
/// enabled, the stage is recorded as completed, and its checkpoint (record
/// + referenced blob) is still present on disk -- the first two of the
/// three-condition resume check (spec.md §9); the third, `resume_enabled`,
/// is checked by the caller before this is consulted.
fn should_skip_checkpoint(store: &CheckpointStore, completed: &[String], stage: PipelineStage) -> bool {
    let key = stage_key(stage);
    completed.iter().any(|s| s == &key) && store.has_checkpoint(&key)
}

fn converted_audio_path(session_dir: &Path) -> PathBuf {
    session_dir.join("converted.wav")
}

/// Wires together every component needed to run a session end to end.
pub struct Orchestrator {
    config: SessionConfig,
    status: Arc<dyn StatusTracker>,
    transcoder: Transcoder,
    vad: Box<dyn VoiceActivityDetector>,
    chunker_config: ChunkerConfig,
    transcription_backend: Arc<dyn TranscriptionBackend>,
    diarization_backend: Arc<dyn DiarizationBackend>,
    classifier: Arc<dyn Classifier>,
    snippet_exporter: SnippetExporter,
    knowledge_extractor: Arc<dyn KnowledgeExtractor>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SessionConfig,
        status: Arc<dyn StatusTracker>,
        transcoder: Transcoder,
        vad: Box<dyn VoiceActivityDetector>,
        chunker_config: ChunkerConfig,
        transcription_backend: Arc<dyn TranscriptionBackend>,
        diarization_backend: Arc<dyn DiarizationBackend>,
        classifier: Arc<dyn Classifier>,
        knowledge_extractor: Arc<dyn KnowledgeExtractor>,
    ) -> Self {
        let snippet_exporter = SnippetExporter::new(transcoder.clone());
        Self {
            config,
            status,
            transcoder,
            vad,
            chunker_config,
            transcription_backend,
            diarization_backend,
            classifier,
            snippet_exporter,
            knowledge_extractor,
        }
    }

    fn report(&self, session_id: &str, stage: PipelineStage, status: StageStatus, message: impl Into<String>) {
        self.status.update_stage(StatusUpdate {
            session_id: session_id.to_string(),
            stage_number: stage.number(),
            status,
            message: message.into(),
            details: None,
        });
    }

    fn check_cancel(&self, cancel: &CancellationToken, stage: PipelineStage) -> Result<(), OrchestratorError> {
        if cancel.is_cancelled() {
            Err(OrchestratorError::Cancelled(stage.name()))
        } else {
            Ok(())
        }
    }

    fn critical_failure(
        &self,
        session_id: &str,
        stage: PipelineStage,
        source: impl Into<TablescribeError>,
    ) -> OrchestratorError {
        let source = source.into();
        self.report(session_id, stage, StageStatus::Failed, source.to_string());
        self.status.fail_session(session_id, &source.to_string());
        OrchestratorError::StageFailed {
            stage: stage.name(),
            source,
        }
    }

    fn mark_completed(
        &self,
        store: &CheckpointStore,
        completed: &mut Vec<String>,
        stage: PipelineStage,
        data: serde_json::Value,
    ) -> Result<(), TablescribeError> {
        let key = stage_key(stage);
        store.save(&key, &data, completed, serde_json::json!({}))?;
        completed.push(key);
        Ok(())
    }

    fn run_preflight(&self, skip: crate::pipeline::session::SkipFlags) -> Result<(), OrchestratorError> {
        let issues = preflight::verify(
            self.transcription_backend.as_ref(),
            self.diarization_backend.as_ref(),
            self.classifier.as_ref(),
            skip.skip_diarization,
            skip.skip_classification,
        )
        .map_err(OrchestratorError::Preflight)?;
        for issue in issues.iter().filter(|i| !i.is_error()) {
            tracing::warn!(component = %issue.component, message = %issue.message, "preflight warning");
        }
        Ok(())
    }

    /// Run a session to completion, honoring resume (both the automatic
    /// checkpoint mechanism and the explicit `--from-stage` entry point).
    pub fn run(
        &self,
        request: &ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, OrchestratorError> {
        let session_id = self.config.safe_session_id();
        let session_dir = request.output_dir.join(&session_id);
        std::fs::create_dir_all(&session_dir)
            .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioConverted, AudioError::from(e)))?;

        let checkpoint_store = CheckpointStore::new(session_id.clone(), session_dir.join("checkpoints"))
            .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioConverted, e))?;
        let intermediate = IntermediateOutputManager::new(&session_dir);

        self.run_preflight(request.skip)?;
        self.status.start_session(&session_id);

        let mut completed_stages = checkpoint_store.list_stages().unwrap_or_default();
        let mut stage_results = Vec::new();
        let explicit_start = request.resume_from.unwrap_or(PipelineStage::AudioConverted);
        let audio_path = converted_audio_path(&session_dir);

        macro_rules! entered_via_checkpoint {
            ($stage:expr) => {
                self.config.resume_enabled && should_skip_checkpoint(&checkpoint_store, &completed_stages, $stage)
            };
        }

        // Stage 1: Audio Transcoder.
        if explicit_start.number() > PipelineStage::AudioConverted.number() {
            stage_results.push(StageResult::skipped(PipelineStage::AudioConverted, "entered via --from-stage"));
        } else if entered_via_checkpoint!(PipelineStage::AudioConverted) && audio_path.exists() {
            stage_results.push(StageResult::skipped(PipelineStage::AudioConverted, "resumed from checkpoint"));
        } else {
            self.check_cancel(cancel, PipelineStage::AudioConverted)?;
            let started = Instant::now();
            self.transcoder
                .transcode(&request.input_file, &audio_path)
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioConverted, e))?;
            self.mark_completed(
                &checkpoint_store,
                &mut completed_stages,
                PipelineStage::AudioConverted,
                serde_json::json!({"path": audio_path.display().to_string()}),
            )
            .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioConverted, e))?;
            self.report(&session_id, PipelineStage::AudioConverted, StageStatus::Completed, "audio converted");
            stage_results.push(StageResult::completed(
                PipelineStage::AudioConverted,
                serde_json::Value::Null,
                started.elapsed().as_secs_f64(),
            ));
        }

        // Stage 2: VAD-Hybrid Chunker.
        let need_chunk_buffers = explicit_start.number() <= PipelineStage::AudioTranscribed.number()
            && !entered_via_checkpoint!(PipelineStage::AudioTranscribed);
        let chunks: Vec<AudioChunk> = if explicit_start.number() > PipelineStage::AudioChunked.number() {
            stage_results.push(StageResult::skipped(PipelineStage::AudioChunked, "entered via --from-stage"));
            Vec::new()
        } else if entered_via_checkpoint!(PipelineStage::AudioChunked) {
            stage_results.push(StageResult::skipped(PipelineStage::AudioChunked, "resumed from checkpoint"));
            if need_chunk_buffers {
                self.reconstruct_chunks(&checkpoint_store, &audio_path)
                    .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioChunked, e))?
            } else {
                Vec::new()
            }
        } else {
            self.check_cancel(cancel, PipelineStage::AudioChunked)?;
            let started = Instant::now();
            let duration = self
                .transcoder
                .duration_seconds(&audio_path)
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioChunked, e))?;
            let mut samples = self
                .transcoder
                .load_range(&audio_path, 0.0, duration)
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioChunked, e))?;
            peak_normalize(&mut samples);
            let chunks = match chunker::chunk(&samples, self.vad.as_ref(), self.chunker_config, None) {
                Ok(chunks) => chunks,
                Err(AudioError::ChunkingEmpty) if request.is_test_run => {
                    tracing::warn!(session_id = %session_id, "chunker returned no segments; continuing for test run");
                    Vec::new()
                }
                Err(e) => return Err(self.critical_failure(&session_id, PipelineStage::AudioChunked, e)),
            };
            let metas: Vec<AudioChunkMeta> = chunks.iter().map(AudioChunkMeta::from).collect();
            self.mark_completed(
                &checkpoint_store,
                &mut completed_stages,
                PipelineStage::AudioChunked,
                serde_json::to_value(&metas).expect("AudioChunkMeta always serializes"),
            )
            .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioChunked, e))?;
            self.report(&session_id, PipelineStage::AudioChunked, StageStatus::Completed, format!("{} chunks", chunks.len()));
            stage_results.push(StageResult::completed(
                PipelineStage::AudioChunked,
                serde_json::Value::Null,
                started.elapsed().as_secs_f64(),
            ));
            chunks
        };

        // Stage 3: Transcription Backend.
        let chunk_transcriptions: Vec<ChunkTranscription> = if explicit_start.number()
            > PipelineStage::AudioTranscribed.number()
        {
            stage_results.push(StageResult::skipped(PipelineStage::AudioTranscribed, "entered via --from-stage"));
            Vec::new()
        } else if entered_via_checkpoint!(PipelineStage::AudioTranscribed) {
            stage_results.push(StageResult::skipped(PipelineStage::AudioTranscribed, "resumed from checkpoint"));
            let (_, data) = checkpoint_store
                .load(&stage_key(PipelineStage::AudioTranscribed))
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioTranscribed, e))?
                .expect("should_skip_checkpoint guarantees presence");
            serde_json::from_value(data)
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioTranscribed, TablescribeError::Json(e)))?
        } else {
            self.check_cancel(cancel, PipelineStage::AudioTranscribed)?;
            let started = Instant::now();
            let mut transcriptions = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                self.check_cancel(cancel, PipelineStage::AudioTranscribed)?;
                let result = self
                    .transcription_backend
                    .transcribe_chunk(chunk, &self.config.language)
                    .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioTranscribed, e))?;
                transcriptions.push(result);
            }
            self.mark_completed(
                &checkpoint_store,
                &mut completed_stages,
                PipelineStage::AudioTranscribed,
                serde_json::to_value(&transcriptions).expect("ChunkTranscription always serializes"),
            )
            .map_err(|e| self.critical_failure(&session_id, PipelineStage::AudioTranscribed, e))?;
            self.report(
                &session_id,
                PipelineStage::AudioTranscribed,
                StageStatus::Completed,
                format!("{} chunks transcribed", transcriptions.len()),
            );
            stage_results.push(StageResult::completed(
                PipelineStage::AudioTranscribed,
                serde_json::Value::Null,
                started.elapsed().as_secs_f64(),
            ));
            transcriptions
        };

        // Stage 4: Overlap Merger (the first `--from-stage` resume point).
        let merged_segments: Vec<TranscriptionSegment> = if explicit_start.number() > 4 {
            stage_results.push(StageResult::skipped(PipelineStage::TranscriptionMerged, "entered via --from-stage"));
            Vec::new()
        } else if explicit_start == PipelineStage::TranscriptionMerged {
            stage_results.push(StageResult::skipped(PipelineStage::TranscriptionMerged, "entered via --from-stage"));
            intermediate
                .load_merged_transcript()
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::TranscriptionMerged, e))?
        } else if entered_via_checkpoint!(PipelineStage::TranscriptionMerged) {
            stage_results.push(StageResult::skipped(PipelineStage::TranscriptionMerged, "resumed from checkpoint"));
            let (_, data) = checkpoint_store
                .load(&stage_key(PipelineStage::TranscriptionMerged))
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::TranscriptionMerged, e))?
                .expect("should_skip_checkpoint guarantees presence");
            serde_json::from_value(data).map_err(|e| {
                self.critical_failure(&session_id, PipelineStage::TranscriptionMerged, TablescribeError::Json(e))
            })?
        } else {
            self.check_cancel(cancel, PipelineStage::TranscriptionMerged)?;
            let started = Instant::now();
            let merger = crate::transcription::TranscriptionMerger::default();
            let merged = merger.merge_transcriptions(&chunk_transcriptions);
            intermediate
                .save_merged_transcript(&merged, Some(&request.input_file.display().to_string()))
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::TranscriptionMerged, e))?;
            self.mark_completed(
                &checkpoint_store,
                &mut completed_stages,
                PipelineStage::TranscriptionMerged,
                serde_json::to_value(&merged).expect("TranscriptionSegment always serializes"),
            )
            .map_err(|e| self.critical_failure(&session_id, PipelineStage::TranscriptionMerged, e))?;
            self.report(
                &session_id,
                PipelineStage::TranscriptionMerged,
                StageStatus::Completed,
                format!("{} segments merged", merged.len()),
            );
            stage_results.push(StageResult::completed(
                PipelineStage::TranscriptionMerged,
                serde_json::Value::Null,
                started.elapsed().as_secs_f64(),
            ));
            merged
        };

        // Stage 5: Diarization Backend + Speaker Aligner (degradable).
        let mut labeled_segments: Vec<LabeledSegment> = if request.skip.skip_diarization {
            stage_results.push(StageResult::skipped(PipelineStage::SpeakerDiarized, "skip_diarization"));
            merged_segments
                .iter()
                .cloned()
                .map(|s| LabeledSegment {
                    text: s.text,
                    start_time: s.start_time,
                    end_time: s.end_time,
                    speaker_id: crate::model::UNKNOWN_SPEAKER.to_string(),
                    confidence: s.confidence,
                    words: s.words,
                })
                .collect()
        } else if explicit_start.number() > 5 {
            stage_results.push(StageResult::skipped(PipelineStage::SpeakerDiarized, "entered via --from-stage"));
            Vec::new()
        } else if explicit_start == PipelineStage::SpeakerDiarized {
            stage_results.push(StageResult::skipped(PipelineStage::SpeakerDiarized, "entered via --from-stage"));
            intermediate
                .load_diarization()
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::SpeakerDiarized, e))?
        } else if entered_via_checkpoint!(PipelineStage::SpeakerDiarized) {
            stage_results.push(StageResult::skipped(PipelineStage::SpeakerDiarized, "resumed from checkpoint"));
            let (_, data) = checkpoint_store
                .load(&stage_key(PipelineStage::SpeakerDiarized))
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::SpeakerDiarized, e))?
                .expect("should_skip_checkpoint guarantees presence");
            serde_json::from_value(data).map_err(|e| {
                self.critical_failure(&session_id, PipelineStage::SpeakerDiarized, TablescribeError::Json(e))
            })?
        } else {
            let started = Instant::now();
            let speaker_segments = match self.diarization_backend.diarize(&audio_path) {
                Ok((segments, _embeddings)) => segments,
                Err(e) => {
                    tracing::warn!(error = %e, "diarization failed, falling back to a single UNKNOWN speaker");
                    stage_results.push(StageResult::failed(PipelineStage::SpeakerDiarized, e.to_string(), started.elapsed().as_secs_f64()));
                    Vec::new()
                }
            };
            let labeled = assign_speakers(&merged_segments, &speaker_segments);
            let _ = intermediate.save_diarization(&labeled, None);
            if self
                .mark_completed(
                    &checkpoint_store,
                    &mut completed_stages,
                    PipelineStage::SpeakerDiarized,
                    serde_json::to_value(&labeled).expect("LabeledSegment always serializes"),
                )
                .is_ok()
            {
                self.report(&session_id, PipelineStage::SpeakerDiarized, StageStatus::Completed, format!("{} speakers assigned", labeled.len()));
                stage_results.push(StageResult::completed(
                    PipelineStage::SpeakerDiarized,
                    serde_json::Value::Null,
                    started.elapsed().as_secs_f64(),
                ));
            }
            labeled
        };
        // Stage 6: Classifier Backend (degradable).
        let classifications: Vec<Classification> = if request.skip.skip_classification {
            stage_results.push(StageResult::skipped(PipelineStage::SegmentsClassified, "skip_classification"));
            labeled_segments
                .iter()
                .enumerate()
                .map(|(i, _)| Classification::default_ic(i, 0.0, "classification skipped"))
                .collect()
        } else if explicit_start == PipelineStage::SegmentsClassified {
            stage_results.push(StageResult::skipped(PipelineStage::SegmentsClassified, "entered via --from-stage"));
            let (segments, classifications) = intermediate
                .load_classification()
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::SegmentsClassified, e))?;
            labeled_segments = segments;
            classifications
        } else if entered_via_checkpoint!(PipelineStage::SegmentsClassified) {
            stage_results.push(StageResult::skipped(PipelineStage::SegmentsClassified, "resumed from checkpoint"));
            let (_, data) = checkpoint_store
                .load(&stage_key(PipelineStage::SegmentsClassified))
                .map_err(|e| self.critical_failure(&session_id, PipelineStage::SegmentsClassified, e))?
                .expect("should_skip_checkpoint guarantees presence");
            serde_json::from_value(data).map_err(|e| {
                self.critical_failure(&session_id, PipelineStage::SegmentsClassified, TablescribeError::Json(e))
            })?
        } else {
            let started = Instant::now();
            let texts: Vec<String> = labeled_segments.iter().map(|s| s.text.clone()).collect();
            let classifications = match self.classifier.classify_segments(
                &texts,
                &self.config.character_names,
                &self.config.player_names,
            ) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "classification failed, defaulting every segment to IC");
                    stage_results.push(StageResult::failed(
                        PipelineStage::SegmentsClassified,
                        e.to_string(),
                        started.elapsed().as_secs_f64(),
                    ));
                    texts
                        .iter()
                        .enumerate()
                        .map(|(i, _)| Classification::default_ic(i, 0.0, format!("classification failed: {e}")))
                        .collect()
                }
            };

            for (index, classification) in classifications.iter().enumerate() {
                let entry = build_audit_entry(
                    index,
                    texts.get(index).map(String::as_str).unwrap_or_default(),
                    &serde_json::to_string(classification).unwrap_or_default(),
                    self.classifier.name(),
                    serde_json::json!({}),
                    None,
                    self.config.num_speakers,
                    false,
                );
                if let Err(e) = intermediate.append_audit_log(&entry) {
                    tracing::warn!(error = %e, "failed to append classification audit log entry");
                }
            }

            let _ = intermediate.save_classification(&labeled_segments, &classifications, None);
            if self
                .mark_completed(
                    &checkpoint_store,
                    &mut completed_stages,
                    PipelineStage::SegmentsClassified,
                    serde_json::to_value(&classifications).expect("Classification always serializes"),
                )
                .is_ok()
            {
                self.report(
                    &session_id,
                    PipelineStage::SegmentsClassified,
                    StageStatus::Completed,
                    format!("{} segments classified", classifications.len()),
                );
                stage_results.push(StageResult::completed(
                    PipelineStage::SegmentsClassified,
                    serde_json::Value::Null,
                    started.elapsed().as_secs_f64(),
                ));
            }
            classifications
        };

        // Stage 7: Formatter (critical -- a run without rendered output is
        // not a useful run, same as original_source treating this step as
        // blocking).
        self.check_cancel(cancel, PipelineStage::OutputsGenerated)?;
        let started = Instant::now();
        let speaker_profiles: HashMap<String, String> = HashMap::new();
        let metadata = serde_json::json!({
            "session_id": session_id,
            "campaign_id": self.config.campaign_id,
            "party_id": self.config.party_id,
            "language": self.config.language,
        });
        let formats = formatter::save_all_formats(
            &session_dir,
            &session_id,
            &labeled_segments,
            &classifications,
            &speaker_profiles,
            metadata,
        )
        .map_err(|e| self.critical_failure(&session_id, PipelineStage::OutputsGenerated, AudioError::from(e)))?;
        self.report(&session_id, PipelineStage::OutputsGenerated, StageStatus::Completed, "outputs written");
        stage_results.push(StageResult::completed(
            PipelineStage::OutputsGenerated,
            serde_json::Value::Null,
            started.elapsed().as_secs_f64(),
        ));

        // Stage 8: Streaming Snippet Exporter (optional).
        let snippet_manifest = if request.skip.skip_snippets {
            stage_results.push(StageResult::skipped(PipelineStage::AudioSegmentsExported, "skip_snippets"));
            None
        } else {
            match self.snippet_exporter.export_segments(
                &audio_path,
                &labeled_segments,
                &request.output_dir,
                &session_id,
                &classifications,
            ) {
                Ok(manifest) => {
                    self.report(&session_id, PipelineStage::AudioSegmentsExported, StageStatus::Completed, "snippets exported");
                    stage_results.push(StageResult::completed(
                        PipelineStage::AudioSegmentsExported,
                        serde_json::Value::Null,
                        0.0,
                    ));
                    manifest
                }
                Err(e) => {
                    tracing::warn!(error = %e, "snippet export failed, continuing without clips");
                    stage_results.push(StageResult::failed(PipelineStage::AudioSegmentsExported, e.to_string(), 0.0));
                    None
                }
            }
        };

        // Stage 9: Knowledge Extractor (optional).
        let knowledge = if request.skip.skip_knowledge {
            stage_results.push(StageResult::skipped(PipelineStage::KnowledgeExtracted, "skip_knowledge"));
            None
        } else {
            match self.knowledge_extractor.extract(&session_id, &labeled_segments) {
                Ok(kb) => {
                    self.report(&session_id, PipelineStage::KnowledgeExtracted, StageStatus::Completed, "knowledge extracted");
                    stage_results.push(StageResult::completed(PipelineStage::KnowledgeExtracted, serde_json::Value::Null, 0.0));
                    Some(kb)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "knowledge extraction failed, continuing without it");
                    stage_results.push(StageResult::failed(PipelineStage::KnowledgeExtracted, e.to_string(), 0.0));
                    None
                }
            }
        };

        self.status.complete_session(&session_id);
        let statistics = formatter::generate_stats(&labeled_segments, &classifications);

        Ok(SessionOutcome {
            session_dir,
            segments: labeled_segments,
            classifications,
            statistics,
            formats: Some(formats),
            snippet_manifest,
            knowledge,
            stage_results,
        })
    }

    /// Reconstruct in-memory chunk buffers from a checkpointed
    /// `Vec<AudioChunkMeta>` by re-reading the converted WAV, matching
    /// `original_source`'s `_reconstruct_chunks_from_checkpoint`.
    fn reconstruct_chunks(
        &self,
        store: &CheckpointStore,
        audio_path: &Path,
    ) -> Result<Vec<AudioChunk>, TablescribeError> {
        let (_, data) = store
            .load(&stage_key(PipelineStage::AudioChunked))?
            .expect("should_skip_checkpoint guarantees presence");
        let metas: Vec<AudioChunkMeta> = serde_json::from_value(data)?;
        let mut chunks = Vec::with_capacity(metas.len());
        for meta in metas {
            let samples = self.transcoder.load_range(audio_path, meta.start_time, meta.end_time)?;
            chunks.push(AudioChunk {
                chunk_index: meta.chunk_index,
                start_time: meta.start_time,
                end_time: meta.end_time,
                sample_rate: meta.sample_rate,
                samples,
            });
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_key_combines_number_and_lowercase_name() {
        assert_eq!(stage_key(PipelineStage::TranscriptionMerged), "4_transcription_merged");
        assert_eq!(stage_key(PipelineStage::KnowledgeExtracted), "9_knowledge_extracted");
    }

    #[test]
    fn cancellation_token_latches_once_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn checkpoint_skip_requires_both_listing_and_blob_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new("s1", dir.path()).unwrap();
        store
            .save(
                &stage_key(PipelineStage::TranscriptionMerged),
                &serde_json::json!([]),
                &[],
                serde_json::json!({}),
            )
            .unwrap();

        let completed = vec![stage_key(PipelineStage::TranscriptionMerged)];
        assert!(should_skip_checkpoint(&store, &completed, PipelineStage::TranscriptionMerged));
        assert!(!should_skip_checkpoint(&store, &completed, PipelineStage::SpeakerDiarized));
        assert!(!should_skip_checkpoint(&store, &[], PipelineStage::TranscriptionMerged));
    }

    #[test]
    fn converted_audio_path_is_inside_the_session_directory() {
        let path = converted_audio_path(Path::new("/tmp/sessions/s1"));
        assert_eq!(path, PathBuf::from("/tmp/sessions/s1/converted.wav"));
    }
}
