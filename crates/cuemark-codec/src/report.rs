//! Import modes and the aggregate import report.

use core::fmt;

use serde::{Deserialize, Serialize};

use cuemark_types::CoercionError;

/// Number of entry errors listed verbatim by [`ImportReport::summary`].
pub const SUMMARY_LIMIT: usize = 5;

/// How a palette import treats templates already in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing templates; entries whose name is taken are skipped.
    #[default]
    Merge,
    /// Drop every template first, then load the file.
    Replace,
}

/// Which list of a document an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// An entry of a `templates` list.
    Template,
    /// An entry of an `events` list.
    Event,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => write!(f, "Template"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// What was wrong with a single entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryProblem {
    /// The entry is not a JSON object.
    #[error("entry is not an object")]
    NotAnObject,

    /// A required key is absent.
    #[error("missing '{0}' field")]
    MissingKey(&'static str),

    /// A key is present but holds the wrong JSON type.
    #[error("'{key}' must be {expected}")]
    WrongType {
        /// The offending key.
        key: &'static str,
        /// Description of the accepted type.
        expected: &'static str,
    },

    /// The color is not an array of three numbers; red was used.
    #[error("malformed color, using red")]
    MalformedColor,

    /// A field declares a type tag outside the six known kinds.
    #[error("field '{field}' has unknown type '{tag}'")]
    UnknownFieldType {
        /// Field name.
        field: String,
        /// The unrecognized tag.
        tag: String,
    },

    /// A field's default could not be converted; the kind default was used.
    #[error("field '{field}' default ignored: {source}")]
    BadDefault {
        /// Field name.
        field: String,
        /// The conversion failure.
        #[source]
        source: CoercionError,
    },
}

/// A problem with one entry, tagged with its zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    /// List the entry belongs to.
    pub section: Section,
    /// Zero-based index within that list.
    pub index: usize,
    /// What went wrong.
    pub problem: EntryProblem,
}

impl EntryError {
    /// An error for entry `index` of `section`.
    pub const fn new(section: Section, index: usize, problem: EntryProblem) -> Self {
        Self {
            section,
            index,
            problem,
        }
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: {}", self.section, self.index, self.problem)
    }
}

/// Counts and per-entry warnings collected by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Primary entries loaded: templates for a palette, events for an
    /// events file.
    pub imported: usize,
    /// Templates merged from the `templates` section of an events file.
    pub templates_imported: usize,
    /// Entries left out on purpose (name already taken, or no name).
    pub skipped: usize,
    /// Entry-level problems, in document order.
    pub errors: Vec<EntryError>,
}

impl ImportReport {
    /// Whether any entry reported a problem.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Multi-line warning listing the first few errors, or `None` when the
    /// import was clean.
    pub fn summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let mut lines = vec![format!(
            "Import completed with {} errors:",
            self.errors.len()
        )];
        lines.extend(
            self.errors
                .iter()
                .take(SUMMARY_LIMIT)
                .map(ToString::to_string),
        );
        let hidden = self.errors.len().saturating_sub(SUMMARY_LIMIT);
        if hidden > 0 {
            lines.push(format!("... and {hidden} more errors"));
        }
        Some(lines.join("\n"))
    }

    pub(crate) fn record(&mut self, section: Section, index: usize, problem: EntryProblem) {
        self.errors.push(EntryError::new(section, index, problem));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_frame(index: usize) -> EntryError {
        EntryError::new(Section::Event, index, EntryProblem::MissingKey("frame"))
    }

    #[test]
    fn entry_error_display() {
        assert_eq!(missing_frame(3).to_string(), "Event #3: missing 'frame' field");
        let color = EntryError::new(Section::Template, 0, EntryProblem::MalformedColor);
        assert_eq!(color.to_string(), "Template #0: malformed color, using red");
    }

    #[test]
    fn clean_report_has_no_summary() {
        let report = ImportReport {
            imported: 3,
            ..ImportReport::default()
        };
        assert!(report.summary().is_none());
        assert!(!report.has_errors());
    }

    #[test]
    fn summary_truncates_after_five() {
        let report = ImportReport {
            errors: (0..8).map(missing_frame).collect(),
            ..ImportReport::default()
        };
        let summary = report.summary().unwrap_or_default();
        let lines: Vec<_> = summary.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines.first().copied(), Some("Import completed with 8 errors:"));
        assert_eq!(lines.get(5).copied(), Some("Event #4: missing 'frame' field"));
        assert_eq!(lines.last().copied(), Some("... and 3 more errors"));
    }

    #[test]
    fn import_mode_parses_lowercase() {
        let mode: Result<ImportMode, _> = serde_json::from_str("\"replace\"");
        assert_eq!(mode.ok(), Some(ImportMode::Replace));
        assert_eq!(ImportMode::default(), ImportMode::Merge);
    }
}
