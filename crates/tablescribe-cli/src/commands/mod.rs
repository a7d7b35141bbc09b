pub mod resume;
pub mod run;

use std::sync::Arc;

use tablescribe_core::audio::chunker::ChunkerConfig;
use tablescribe_core::audio::vad::EnergyVad;
use tablescribe_core::audio::Transcoder;
use tablescribe_core::backends;
use tablescribe_core::config::Settings;
use tablescribe_core::knowledge::NullKnowledgeExtractor;
use tablescribe_core::pipeline::orchestrator::Orchestrator;
use tablescribe_core::pipeline::session::SessionConfig;
use tablescribe_core::status::TracingStatusTracker;

/// Build an [`Orchestrator`] wired with every backend named on `config`,
/// resolved from environment-assembled [`Settings`] -- the shared setup
/// behind both the `run` and resume flows.
pub fn build_orchestrator(config: SessionConfig, settings: &Settings) -> Orchestrator {
    let transcoder = match &settings.transcoder_binary {
        Some(path) => Transcoder::with_binary(path.clone()),
        None => Transcoder::discover(),
    };
    let transcription_backend = backends::build_transcription_backend(settings, &config.transcription_backend);
    let diarization_backend = backends::build_diarization_backend(settings, &config.diarization_backend);
    let classifier = backends::build_classifier(settings, &config.classification_backend);

    Orchestrator::new(
        config,
        Arc::new(TracingStatusTracker),
        transcoder,
        Box::new(EnergyVad),
        ChunkerConfig::default(),
        transcription_backend,
        diarization_backend,
        classifier,
        Arc::new(NullKnowledgeExtractor),
    )
}
