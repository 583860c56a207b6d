//! Shared data model for Cuemark.
//!
//! Cuemark lets a user define reusable event templates (a name, a color, a
//! description and an ordered set of typed custom fields), place instances of
//! those templates at integer frames on a timeline, and persist both as JSON.
//! This crate is the single source of truth for the entity types used by the
//! timeline store, the codecs and the command-line tool.
//!
//! # Modules
//!
//! - [`ids`] -- Stable UUID wrappers for templates and instances
//! - [`enums`] -- Field kinds and the operation outcome
//! - [`value`] -- Typed values and the JSON coercion rules
//! - [`structs`] -- Templates, field definitions, field values, instances

pub mod enums;
pub mod ids;
pub mod structs;
pub mod value;

// Re-export all public types at crate root for convenience.
pub use enums::{FieldKind, Outcome, UnknownKindError};
pub use ids::{InstanceId, TemplateId};
pub use structs::{
    EventInstance, FieldDefinition, FieldValue, Frame, Rgb, Template, marker_name_for,
};
pub use value::{
    Coerced, CoercionError, Value, coerce, coerce_or_string, infer, parse_enum_options,
    split_array, stringify,
};
