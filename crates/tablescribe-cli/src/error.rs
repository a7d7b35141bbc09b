//! CLI error display: match on the failing variant and print a short,
//! actionable hint alongside the underlying [`OrchestratorError`]/
//! [`TablescribeError`] message.

use tablescribe_core::error::TablescribeError;
use tablescribe_core::pipeline::orchestrator::OrchestratorError;

/// Print an error to stderr with a short, actionable hint where one exists.
pub fn display_error(err: &OrchestratorError) {
    match err {
        OrchestratorError::Preflight(message) => {
            eprintln!("Error: preflight checks failed");
            eprintln!("{message}");
            eprintln!();
            eprintln!("Hint: configure the missing API key/token as an environment variable");
            eprintln!("(or in a .env file), or pass --skip-diarization / --skip-classification");
            eprintln!("to run without that stage.");
        }
        OrchestratorError::Cancelled(stage) => {
            eprintln!("Cancelled before stage: {stage}");
        }
        OrchestratorError::StageFailed { stage, source } => {
            eprintln!("Error: stage '{stage}' failed");
            display_tablescribe_error(source);
        }
    }
}

fn display_tablescribe_error(err: &TablescribeError) {
    eprintln!("{err}");
    match err {
        TablescribeError::Audio(_) => {
            eprintln!();
            eprintln!("Hint: check that the transcoder binary (ffmpeg) is on PATH, or set");
            eprintln!("TABLESCRIBE_FFMPEG_PATH to its location.");
        }
        TablescribeError::Transcription(_) | TablescribeError::Diarization(_) | TablescribeError::Classification(_) => {
            eprintln!();
            eprintln!("Hint: common causes are a missing/invalid API key, a rate limit, or a");
            eprintln!("network error talking to the backend.");
        }
        TablescribeError::Checkpoint(_) | TablescribeError::Intermediate(_) => {
            eprintln!();
            eprintln!("Hint: check that --session-dir is writable and was not modified by");
            eprintln!("another process.");
        }
        TablescribeError::RateLimit(_) => {
            eprintln!();
            eprintln!("Hint: wait before retrying, or raise the relevant *_MAX_CALLS /");
            eprintln!("*_PERIOD_SECS environment variable.");
        }
        _ => {}
    }
}

/// Print an error that happened before an [`OrchestratorError`] could even be
/// constructed (argument validation, session setup).
pub fn display_anyhow_error(err: &anyhow::Error) {
    eprintln!("Error: {err:#}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_prints_the_stage_name_without_panicking() {
        display_error(&OrchestratorError::Cancelled("audio_converted"));
    }
}
