//! Default (no subcommand) action: the intermediate-resume tool from
//! spec.md §6. Re-enters a session directory at stage 4, 5, or 6 using the
//! prior stage's saved intermediate output.

use std::path::PathBuf;

use anyhow::{bail, Context};

use tablescribe_core::config::Settings;
use tablescribe_core::pipeline::orchestrator::{CancellationToken, SessionOutcome};
use tablescribe_core::pipeline::session::{ProcessRequest, SessionConfig, SkipFlags};
use tablescribe_core::pipeline::PipelineStage;

use crate::args::ResumeArgs;

pub fn run(args: ResumeArgs, cancel: &CancellationToken) -> anyhow::Result<SessionOutcome> {
    let session_dir = args
        .session_dir
        .context("--session-dir is required when no subcommand is given")?;
    let from_stage = args
        .from_stage
        .context("--from-stage is required when no subcommand is given")?;

    if !session_dir.is_dir() {
        bail!("--session-dir {} does not exist or is not a directory", session_dir.display());
    }
    let session_id = session_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("--session-dir has no final path component to use as the session id")?;
    let output_dir: PathBuf = session_dir
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let settings = Settings::from_env();

    let mut config = SessionConfig::new(session_id);
    config.campaign_id = args.scope.campaign_id;
    config.party_id = args.scope.party_id;
    let orchestrator = super::build_orchestrator(config, &settings);

    let request = ProcessRequest {
        input_file: PathBuf::new(),
        output_dir,
        skip: SkipFlags {
            skip_diarization: args.scope.skip_diarization,
            skip_classification: args.scope.skip_classification,
            skip_snippets: args.scope.skip_snippets,
            skip_knowledge: args.scope.skip_knowledge,
        },
        is_test_run: false,
        resume_from: Some(from_stage),
    };

    orchestrator.run(&request, cancel).map_err(anyhow::Error::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn requires_session_dir_and_from_stage() {
        let cancel = CancellationToken::new();
        let args = ResumeArgs {
            session_dir: None,
            from_stage: None,
            scope: crate::args::ScopeArgs {
                skip_diarization: false,
                skip_classification: false,
                skip_snippets: false,
                skip_knowledge: false,
                party_id: None,
                campaign_id: None,
            },
        };
        assert!(run(args, &cancel).is_err());
    }

    #[test]
    fn rejects_a_session_dir_that_does_not_exist() {
        let cancel = CancellationToken::new();
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nonexistent-session");
        let args = ResumeArgs {
            session_dir: Some(missing),
            from_stage: Some(PipelineStage::TranscriptionMerged),
            scope: crate::args::ScopeArgs {
                skip_diarization: false,
                skip_classification: false,
                skip_snippets: false,
                skip_knowledge: false,
                party_id: None,
                campaign_id: None,
            },
        };
        assert!(run(args, &cancel).is_err());
    }
}
