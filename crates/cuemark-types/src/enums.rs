//! Enumeration types shared across the Cuemark workspace.
//!
//! [`FieldKind`] is the closed set of value kinds a custom field can hold;
//! [`Outcome`] is the ternary result every user-facing operation collapses to.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field kinds
// ---------------------------------------------------------------------------

/// The kind of value a custom field holds.
///
/// Serialized with the upper-case tags used by palette files
/// (`BOOL`, `STRING`, `INT`, `FLOAT`, `ARRAY`, `ENUM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldKind {
    /// True/false flag.
    Bool,
    /// Free text.
    #[default]
    String,
    /// Whole number.
    Int,
    /// Decimal number.
    Float,
    /// List of strings, stored comma-joined.
    Array,
    /// One selection out of the field definition's option list.
    Enum,
}

impl FieldKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Bool,
        Self::String,
        Self::Int,
        Self::Float,
        Self::Array,
        Self::Enum,
    ];

    /// The wire tag for this kind.
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::String => "STRING",
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Array => "ARRAY",
            Self::Enum => "ENUM",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A field kind tag that is not one of the six known tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field type: {0:?}")]
pub struct UnknownKindError(pub String);

impl FromStr for FieldKind {
    type Err = UnknownKindError;

    /// Parse a wire tag. Matching is case-insensitive so hand-edited files
    /// using `int` or `Float` still load.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_tag().eq_ignore_ascii_case(tag.trim()))
            .ok_or_else(|| UnknownKindError(tag.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Operation outcome
// ---------------------------------------------------------------------------

/// The result class of a user-invoked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The operation completed, possibly with warnings.
    Finished,
    /// The operation was rejected before anything was mutated.
    Cancelled,
    /// An I/O or parse failure.
    Error,
}

impl Outcome {
    /// Process exit code for this outcome.
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Finished => 0,
            Self::Error => 1,
            Self::Cancelled => 2,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip_through_serde() {
        for kind in FieldKind::ALL {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", kind.as_tag()));
            let back: Result<FieldKind, _> = serde_json::from_str(&json);
            assert_eq!(back.ok(), Some(kind));
        }
    }

    #[test]
    fn kind_parse_is_case_insensitive() {
        assert_eq!("int".parse::<FieldKind>().ok(), Some(FieldKind::Int));
        assert_eq!(" Enum ".parse::<FieldKind>().ok(), Some(FieldKind::Enum));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "VECTOR".parse::<FieldKind>().err();
        assert_eq!(err, Some(UnknownKindError("VECTOR".to_owned())));
    }

    #[test]
    fn default_kind_is_string() {
        assert_eq!(FieldKind::default(), FieldKind::String);
    }

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(Outcome::Finished.exit_code(), 0);
        assert_eq!(Outcome::Error.exit_code(), 1);
        assert_eq!(Outcome::Cancelled.exit_code(), 2);
    }
}
