//! `tablescribe run`: process a new recording end to end.

use std::path::PathBuf;

use tablescribe_core::config::Settings;
use tablescribe_core::pipeline::orchestrator::{CancellationToken, OrchestratorError, SessionOutcome};
use tablescribe_core::pipeline::session::{ProcessRequest, SessionConfig, SkipFlags};

use crate::args::ScopeArgs;

#[allow(clippy::too_many_arguments)]
pub fn run(
    input: PathBuf,
    output_dir: PathBuf,
    title: String,
    language: String,
    no_resume: bool,
    scope: ScopeArgs,
    cancel: &CancellationToken,
) -> Result<SessionOutcome, OrchestratorError> {
    let settings = Settings::from_env();

    let mut config = SessionConfig::new(title);
    config.language = language;
    config.campaign_id = scope.campaign_id;
    config.party_id = scope.party_id;
    config.resume_enabled = !no_resume;

    let orchestrator = super::build_orchestrator(config, &settings);

    let request = ProcessRequest {
        input_file: input,
        output_dir,
        skip: SkipFlags {
            skip_diarization: scope.skip_diarization,
            skip_classification: scope.skip_classification,
            skip_snippets: scope.skip_snippets,
            skip_knowledge: scope.skip_knowledge,
        },
        is_test_run: false,
        resume_from: None,
    };

    orchestrator.run(&request, cancel)
}
