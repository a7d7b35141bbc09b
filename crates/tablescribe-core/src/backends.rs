//! Backend factory: resolves a [`crate::pipeline::session::SessionConfig`]'s
//! named backends into concrete trait objects from [`crate::config::Settings`],
//! by matching each backend name against the small set this pipeline knows
//! how to construct.
//!
//! Local backends need an inference engine injected via their own
//! `with_engine`/`with_engine` builder methods, which this factory cannot
//! supply (the model inference itself is out of scope, per spec.md §1);
//! choosing a local backend name here yields a backend that degrades or
//! fails preflight until a caller embeds this library and injects one.

use std::sync::Arc;

use crate::classification::{local::LocalClassifier, offloaded::OffloadedClassifier, remote::RemoteLlmClassifier, Classifier};
use crate::config::Settings;
use crate::diarization::{local::LocalDiarizer, remote::HuggingFaceDiarizer, DiarizationBackend};
use crate::ratelimit::RateLimiter;
use crate::transcription::{
    local::{Device, LocalWhisperBackend},
    remote::{RemoteWhisperBackend, RemoteWhisperConfig},
    TranscriptionBackend,
};

/// Resolve a transcription backend by name: `"whisper"`/`"local-whisper"`
/// selects the local (engine-injectable) backend; anything else is treated
/// as a cloud Whisper-compatible model name and dispatched to
/// [`RemoteWhisperBackend`] when an API key is configured.
pub fn build_transcription_backend(settings: &Settings, name: &str) -> Arc<dyn TranscriptionBackend> {
    match name {
        "whisper" | "local-whisper" => Arc::new(LocalWhisperBackend::new(name, Device::Cpu)),
        other => {
            let rate_limiter = RateLimiter::new(
                settings.transcription_rate_limit.max_calls,
                settings.transcription_rate_limit.period_secs,
                settings.transcription_rate_limit.burst_size,
            );
            let config = RemoteWhisperConfig {
                name: "remote-whisper",
                api_base: settings
                    .transcription_api_base
                    .clone()
                    .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
                model: other.to_string(),
                api_key: settings.transcription_api_key.clone(),
            };
            Arc::new(RemoteWhisperBackend::new(config, rate_limiter))
        }
    }
}

/// Resolve a diarization backend by name: `"pyannote"`/`"local-pyannote"`
/// selects the local (engine-injectable) backend; anything else dispatches
/// to the Hugging Face Inference API offload.
pub fn build_diarization_backend(settings: &Settings, name: &str) -> Arc<dyn DiarizationBackend> {
    match name {
        "pyannote" | "local-pyannote" => Arc::new(LocalDiarizer::new(false)),
        other => Arc::new(HuggingFaceDiarizer::new(settings.diarization_api_token.clone(), other)),
    }
}

/// Resolve a classification backend by name: `"ollama"` talks to a local
/// Ollama server, `"offloaded"` uses the submit-job/poll-result protocol,
/// anything else dispatches to the cloud LLM classifier.
pub fn build_classifier(settings: &Settings, name: &str) -> Arc<dyn Classifier> {
    match name {
        "ollama" => Arc::new(LocalClassifier::new(
            settings.ollama_model_or_default(),
            settings.classification_fallback_model.clone(),
        )),
        "offloaded" => {
            let pending = settings.offloaded_pending_dir.clone().unwrap_or_else(|| "offload/pending".into());
            let complete = settings.offloaded_complete_dir.clone().unwrap_or_else(|| "offload/complete".into());
            Arc::new(
                OffloadedClassifier::new(pending, complete)
                    .with_poll_interval(settings.offloaded.poll_interval)
                    .with_timeout(settings.offloaded.total_timeout),
            )
        }
        other => {
            let rate_limiter = RateLimiter::new(
                settings.classification_rate_limit.max_calls,
                settings.classification_rate_limit.period_secs,
                settings.classification_rate_limit.burst_size,
            );
            Arc::new(RemoteLlmClassifier::new(settings.classification_api_key.clone(), other, rate_limiter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_transcription_name_is_treated_as_a_remote_model() {
        let settings = Settings::from_env();
        let backend = build_transcription_backend(&settings, "whisper-large-v3");
        assert_eq!(backend.name(), "remote-whisper");
    }

    #[test]
    fn local_backend_names_select_the_local_backend() {
        let settings = Settings::from_env();
        let backend = build_transcription_backend(&settings, "whisper");
        assert_eq!(backend.name(), "local-whisper");

        let diarizer = build_diarization_backend(&settings, "pyannote");
        assert_eq!(diarizer.name(), "pyannote");
    }

    #[test]
    fn ollama_and_offloaded_classifier_names_are_recognized() {
        let settings = Settings::from_env();
        assert_eq!(build_classifier(&settings, "ollama").name(), "ollama");
        assert_eq!(build_classifier(&settings, "offloaded").name(), "offloaded");
        assert_eq!(build_classifier(&settings, "llama-3.3-70b-versatile").name(), "groq");
    }
}
