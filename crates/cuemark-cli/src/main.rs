//! `cuemark`: event templates and timeline events from the command line.
//!
//! Every invocation runs one command against a session file that holds the
//! template palette, the placed events and their markers.
//!
//! # Flow
//!
//! 1. Parse the command line
//! 2. Load configuration from `cuemark.yaml` (defaults if absent)
//! 3. Initialize structured logging on stderr
//! 4. Load the session (a new one if the file is missing)
//! 5. Run the command, printing results on stdout
//! 6. Save the session if the command changed it and finished
//!
//! The exit code is 0 when the command finished, 2 when it was cancelled
//! (nothing changed) and 1 on error.

mod cli;
mod commands;
mod config;
mod error;
mod session;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cuemark_types::Outcome;

use crate::cli::Cli;
use crate::config::{CuemarkConfig, LoggingConfig};
use crate::error::CliError;
use crate::session::Session;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CuemarkConfig::load_or_default(&cli.config).map_err(CliError::from) {
        Ok(config) => config,
        Err(err) => {
            init_logging(&LoggingConfig::default(), cli.json_logs);
            return ExitCode::from(report(&err).exit_code());
        }
    };
    init_logging(&config.logging, cli.json_logs);

    let session_path = cli.session.clone().unwrap_or_else(|| config.session.path.clone());
    let outcome = match run(cli, &config, &session_path) {
        Ok(outcome) => outcome,
        Err(err) => report(&err),
    };
    debug!(%outcome, "done");
    ExitCode::from(outcome.exit_code())
}

fn report(err: &CliError) -> Outcome {
    error!(error = %err, "command failed");
    eprintln!("cuemark: {err}");
    err.outcome()
}

fn init_logging(logging: &LoggingConfig, force_json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr);
    if force_json || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli, config: &CuemarkConfig, session_path: &Path) -> Result<Outcome, CliError> {
    let read_only = cli.command.is_read_only();
    let mut session = Session::load(session_path, &config.timeline)?;

    let mut stdout = io::stdout().lock();
    let outcome = commands::execute(cli.command, &mut session.store, &mut stdout)?;

    if outcome == Outcome::Finished && !read_only {
        session.save(session_path)?;
        info!(path = %session_path.display(), "session saved");
    }
    Ok(outcome)
}
