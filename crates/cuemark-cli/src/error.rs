//! Error types for the `cuemark` binary.
//!
//! [`CliError`] wraps every failure a command can hit, so command handlers
//! propagate with `?` and `main` turns the error into an exit code through
//! [`CliError::outcome`].

use std::path::PathBuf;

use cuemark_codec::CodecError;
use cuemark_timeline::TimelineError;
use cuemark_types::Outcome;

use crate::config::ConfigError;

/// Top-level error for the `cuemark` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The timeline store refused the operation.
    #[error("{source}")]
    Timeline {
        /// The underlying store error.
        #[from]
        source: TimelineError,
    },

    /// Reading or writing a palette or events file failed.
    #[error("{source}")]
    Codec {
        /// The underlying codec error.
        #[from]
        source: CodecError,
    },

    /// The session file could not be read or written.
    #[error("session file {}: {source}", .path.display())]
    SessionIo {
        /// Session file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The session file is not a valid session.
    #[error("session file {} is corrupt: {source}", .path.display())]
    SessionFormat {
        /// Session file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing command output failed.
    #[error("output error: {source}")]
    Output {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A named template, field or event does not exist.
    #[error("{what} not found: {name}")]
    NotFound {
        /// Kind of thing looked up.
        what: &'static str,
        /// How it was addressed.
        name: String,
    },
}

impl CliError {
    /// Outcome class of this error.
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Timeline { source } => source.outcome(),
            Self::Codec { source } => source.outcome(),
            Self::NotFound { .. } => Outcome::Cancelled,
            Self::Config { .. }
            | Self::SessionIo { .. }
            | Self::SessionFormat { .. }
            | Self::Output { .. } => Outcome::Error,
        }
    }

    /// A [`CliError::NotFound`] for `what` addressed as `name`.
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }
}
