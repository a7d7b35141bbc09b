//! Command-line surface: a default (no subcommand) action that is the
//! intermediate-resume tool described in spec.md §6, plus a `run`
//! subcommand that drives a full session end to end.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

use tablescribe_core::pipeline::stage::PipelineStage;

#[derive(Parser)]
#[command(name = "tablescribe")]
#[command(version)]
#[command(about = "Resumable speaker-attributed transcription pipeline for tabletop RPG sessions")]
#[command(after_help = "Run with --session-dir and --from-stage to resume a partially processed \
session, or use the 'run' subcommand to process a new recording end to end.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Minimum severity of log lines written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    // Resume-tool arguments (spec.md §6): used when no subcommand is given.
    #[command(flatten)]
    pub resume: ResumeArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Map onto a `tracing` filter directive; `CRITICAL` has no direct
    /// `tracing` equivalent and is treated as `ERROR`, matching the
    /// original's `logging.CRITICAL` being the most restrictive level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Flags shared by both the default resume action and the `run`
/// subcommand: which degradable/optional stages to skip, and which
/// party/campaign this session belongs to.
#[derive(Args, Clone)]
pub struct ScopeArgs {
    /// Skip speaker diarization; every segment is attributed to UNKNOWN.
    #[arg(long)]
    pub skip_diarization: bool,

    /// Skip IC/OOC classification; every segment defaults to IC.
    #[arg(long)]
    pub skip_classification: bool,

    /// Skip per-segment audio snippet export.
    #[arg(long)]
    pub skip_snippets: bool,

    /// Skip knowledge extraction.
    #[arg(long)]
    pub skip_knowledge: bool,

    /// Party this session belongs to, for scoping derived artifacts.
    #[arg(long, value_name = "ID")]
    pub party_id: Option<String>,

    /// Campaign this session belongs to, for scoping derived artifacts.
    #[arg(long, value_name = "ID")]
    pub campaign_id: Option<String>,
}

/// The intermediate-resume tool surface (spec.md §6): re-enter a
/// partially processed session at stage 4, 5, or 6 using its saved
/// intermediate output.
#[derive(Args)]
pub struct ResumeArgs {
    /// Directory containing a previously started session
    /// (`<session-dir>/intermediates/...`).
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub session_dir: Option<PathBuf>,

    /// Stage to resume from, using the prior stage's saved intermediate
    /// output.
    #[arg(long, value_parser = parse_resume_stage)]
    pub from_stage: Option<PipelineStage>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

fn parse_resume_stage(s: &str) -> Result<PipelineStage, String> {
    match s {
        "4" => Ok(PipelineStage::TranscriptionMerged),
        "5" => Ok(PipelineStage::SpeakerDiarized),
        "6" => Ok(PipelineStage::SegmentsClassified),
        other => Err(format!("--from-stage must be 4, 5, or 6 (got '{other}')")),
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a new recording end to end, from raw audio through every
    /// stage, starting a fresh (or checkpoint-resumed) session.
    Run {
        /// Source recording to transcode and process.
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,

        /// Directory under which the session directory is created.
        #[arg(long, value_name = "DIR", default_value = "sessions", value_hint = ValueHint::DirPath)]
        output_dir: PathBuf,

        /// Human-readable session title, sanitized into the session id.
        #[arg(long)]
        title: String,

        /// Spoken language code passed to the transcription backend.
        #[arg(long, default_value = "en")]
        language: String,

        /// Disable automatic checkpoint-based resume for this run.
        #[arg(long)]
        no_resume: bool,

        #[command(flatten)]
        scope: ScopeArgs,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn from_stage_accepts_only_four_five_six() {
        assert_eq!(parse_resume_stage("4").unwrap(), PipelineStage::TranscriptionMerged);
        assert_eq!(parse_resume_stage("5").unwrap(), PipelineStage::SpeakerDiarized);
        assert_eq!(parse_resume_stage("6").unwrap(), PipelineStage::SegmentsClassified);
        assert!(parse_resume_stage("7").is_err());
        assert!(parse_resume_stage("merged").is_err());
    }

    #[test]
    fn log_level_maps_to_a_tracing_filter_directive() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Critical.as_filter(), "error");
    }
}
