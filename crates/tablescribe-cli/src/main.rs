mod args;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tablescribe_core::pipeline::orchestrator::{CancellationToken, OrchestratorError};

fn main() {
    let cli = args::Cli::parse();
    init_logging(cli.log_level);

    let cancel = CancellationToken::new();
    install_cancel_handler(cancel.clone());

    let outcome = match cli.command {
        Some(args::Commands::Run {
            input,
            output_dir,
            title,
            language,
            no_resume,
            scope,
        }) => commands::run::run(input, output_dir, title, language, no_resume, scope, &cancel).map_err(anyhow::Error::new),
        None => commands::resume::run(cli.resume, &cancel),
    };

    match outcome {
        Ok(result) => {
            println!("session directory: {}", result.session_dir.display());
            println!("segments: {}", result.segments.len());
            if let Some(formats) = &result.formats {
                println!("transcript (SRT): {}", formats.full_srt.display());
            }
            std::process::exit(0);
        }
        Err(err) => {
            if matches!(err.downcast_ref::<OrchestratorError>(), Some(OrchestratorError::Cancelled(_))) {
                eprintln!("Interrupted.");
                std::process::exit(130);
            }
            match err.downcast_ref::<OrchestratorError>() {
                Some(orchestrator_err) => error::display_error(orchestrator_err),
                None => error::display_anyhow_error(&err),
            }
            std::process::exit(1);
        }
    }
}

fn init_logging(level: args::LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Cancellation is observed at stage boundaries only (spec.md §5), so a
/// Ctrl+C just flips the token; the orchestrator notices it at the next
/// boundary and leaves the checkpoint intact for a later resume. Uses a
/// dedicated single-thread runtime purely to await the signal, since the
/// orchestrator's `run()` itself is synchronous.
fn install_cancel_handler(cancel: CancellationToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(_) => return,
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    });
}
