//! Timeline store for Cuemark event templates and instances.
//!
//! The store owns the palette of templates and the instances placed on the
//! timeline, and keeps the host's marker list in step with them. Every
//! mutation is validated before anything is written, so a rejected operation
//! leaves templates, instances and markers exactly as they were.
//!
//! # Architecture
//!
//! The timeline crate provides three modules:
//!
//! - [`marker`] -- The [`MarkerStore`] collaborator trait and the in-memory
//!   [`MarkerTrack`].
//! - [`store`] -- The [`TimelineStore`]: template management, placement,
//!   duplication, removal and the frame/template edit protocol.
//! - [`audit`] -- Verification of the uniqueness and mirroring invariants.
//!
//! # Invariants
//!
//! For every pair of instances `a != b`:
//!
//! ```text
//! (a.template_name, a.frame) != (b.template_name, b.frame)
//! ```
//!
//! and for every instance `i`, a marker named
//! `"{i.template_name}_{i.frame}"` exists at `i.frame`. Interactive
//! operations enforce both; bulk import does not guard against duplicates,
//! which [`TimelineStore::audit`] will then report.
//!
//! # Usage
//!
//! ```
//! use cuemark_timeline::{MarkerTrack, TimelineStore};
//!
//! let mut store = TimelineStore::new(MarkerTrack::new());
//! let hit = store.add_template().map(|t| t.id);
//! assert!(hit.is_ok());
//!
//! if let Ok(hit) = hit {
//!     let placed = store.add_to_timeline(hit, 24).map(|i| i.marker_name.clone());
//!     assert_eq!(placed.ok().as_deref(), Some("Event_1_24"));
//!
//!     // A second instance of the same template on the same frame is refused.
//!     assert!(store.add_to_timeline(hit, 24).is_err());
//! }
//! assert!(store.audit().is_consistent());
//! ```

pub mod audit;
pub mod marker;
pub mod store;

// Re-export primary types at crate root.
pub use audit::AuditResult;
pub use marker::{Marker, MarkerStore, MarkerTrack};
pub use store::{DEFAULT_FPS, EditOutcome, TimelineStore};

use cuemark_types::{CoercionError, Frame, InstanceId, Outcome, TemplateId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by timeline store operations.
///
/// All of them are raised before any mutation, so every variant maps to
/// [`Outcome::Cancelled`].
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Another instance of the same template already sits on the frame.
    #[error("event '{template_name}' already exists on frame {frame}")]
    DuplicateEvent {
        /// Template name of the conflicting pair.
        template_name: String,
        /// Frame of the conflicting pair.
        frame: Frame,
    },

    /// No template has the given id.
    #[error("template not found: {0}")]
    UnknownTemplate(TemplateId),

    /// No instance has the given id.
    #[error("event instance not found: {0}")]
    UnknownInstance(InstanceId),

    /// The named field does not exist on the template or instance.
    #[error("field '{field}' not found on '{owner}'")]
    UnknownField {
        /// Template name or marker name of the owner.
        owner: String,
        /// Requested field name.
        field: String,
    },

    /// An operation needed a selected template and none is selected.
    #[error("no event template selected")]
    NoActiveTemplate,

    /// A field edit could not be converted to the field's kind.
    #[error("invalid value for field '{field}': {source}")]
    Coercion {
        /// Field being edited.
        field: String,
        /// The underlying conversion failure.
        #[source]
        source: CoercionError,
    },

    /// An enum edit named a value outside the field's option list.
    #[error("'{value}' is not an option of field '{field}' (options: {})", .options.join(", "))]
    InvalidEnumOption {
        /// Field being edited.
        field: String,
        /// Rejected selection.
        value: String,
        /// Allowed selections.
        options: Vec<String>,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal timeline error: {0}")]
    InternalError(&'static str),
}

impl TimelineError {
    /// Outcome class of this error.
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::InternalError(_) => Outcome::Error,
            _ => Outcome::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant violations
// ---------------------------------------------------------------------------

/// A broken store invariant found by [`TimelineStore::audit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Two or more instances share a `(template_name, frame)` pair.
    DuplicatePlacement {
        /// Shared template name.
        template_name: String,
        /// Shared frame.
        frame: Frame,
    },

    /// An instance's marker name no longer matches its template and frame.
    MarkerNameDrift {
        /// The drifting instance.
        instance: InstanceId,
        /// `"{template_name}_{frame}"`.
        expected: String,
        /// The stored marker name.
        actual: String,
    },

    /// No marker with the instance's marker name exists at its frame.
    MissingMarker {
        /// Marker name looked up.
        name: String,
        /// Frame the marker should be at.
        frame: Frame,
    },
}

impl core::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DuplicatePlacement {
                template_name,
                frame,
            } => write!(f, "duplicate placement of '{template_name}' on frame {frame}"),
            Self::MarkerNameDrift {
                instance,
                expected,
                actual,
            } => write!(
                f,
                "instance {instance} has marker name '{actual}', expected '{expected}'"
            ),
            Self::MissingMarker { name, frame } => {
                write!(f, "marker '{name}' missing at frame {frame}")
            }
        }
    }
}
