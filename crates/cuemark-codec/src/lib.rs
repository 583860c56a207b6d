//! JSON file formats for Cuemark.
//!
//! This crate is the only part of Cuemark that touches the filesystem. It
//! reads and writes two documents:
//!
//! - a **palette** (`{"templates": [...]}`), the reusable event templates;
//! - an **events** file (`{"events": [...]}`), the instances placed on the
//!   timeline.
//!
//! Imports check the document shape before touching the store, then load
//! entries one by one. A bad entry is recorded in the [`ImportReport`] and
//! skipped; it never aborts the rest of the file.
//!
//! # Modules
//!
//! - [`palette`] -- Template export, merge/replace import
//! - [`events`] -- Instance export, destructive import with kind resolution
//! - [`file`] -- Import path guards and JSON read/write
//! - [`report`] -- Import modes, per-entry errors, aggregate report
//! - [`error`] -- Shared error type

pub mod error;
pub mod events;
pub mod file;
pub mod palette;
pub mod report;

// Re-export primary types for convenience.
pub use error::CodecError;
pub use events::{EventRecord, EventsFile, export_events, import_events, load_events, save_events};
pub use file::{check_import_path, read_json, write_json};
pub use palette::{
    FieldRecord, PaletteFile, TemplateRecord, export_palette, import_palette, load_palette,
    save_palette,
};
pub use report::{EntryError, EntryProblem, ImportMode, ImportReport, Section};
