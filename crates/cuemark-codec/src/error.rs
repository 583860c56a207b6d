//! Error types for the codec layer.
//!
//! Structural failures abort an import before the store is touched. Problems
//! with individual entries never surface here; they are collected in the
//! [`ImportReport`](crate::ImportReport) instead.

use std::path::PathBuf;

use cuemark_timeline::TimelineError;
use cuemark_types::Outcome;

/// Errors that can occur while reading or writing palette and events files.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No path was given.
    #[error("no file selected")]
    NoFile,

    /// The path does not exist.
    #[error("file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    /// The path does not carry a `.json` extension.
    #[error("selected file is not a JSON file: {}", .0.display())]
    NotJson(PathBuf),

    /// Reading or writing the file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("invalid JSON file {}: {source}", .path.display())]
    InvalidJson {
        /// File being parsed.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed but does not have the expected shape.
    #[error("invalid {kind} file format: {reason}")]
    Malformed {
        /// `"palette"` or `"events"`.
        kind: &'static str,
        /// What is wrong with the document.
        reason: String,
    },

    /// Serializing an export document failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused to place an imported entry.
    #[error(transparent)]
    Store(#[from] TimelineError),
}

impl CodecError {
    /// Outcome class of this error.
    ///
    /// Path problems are caught before any read and cancel the operation.
    /// Everything else is an error.
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::NoFile | Self::MissingFile(_) | Self::NotJson(_) => Outcome::Cancelled,
            Self::Io { .. }
            | Self::InvalidJson { .. }
            | Self::Malformed { .. }
            | Self::Serialization(_) => Outcome::Error,
            Self::Store(err) => err.outcome(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_guards_cancel() {
        assert_eq!(CodecError::NoFile.outcome(), Outcome::Cancelled);
        assert_eq!(
            CodecError::NotJson(PathBuf::from("a.txt")).outcome(),
            Outcome::Cancelled
        );
    }

    #[test]
    fn malformed_documents_error() {
        let err = CodecError::Malformed {
            kind: "events",
            reason: "missing 'events' section".to_owned(),
        };
        assert_eq!(err.outcome(), Outcome::Error);
        assert_eq!(
            err.to_string(),
            "invalid events file format: missing 'events' section"
        );
    }
}
