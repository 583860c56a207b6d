//! Events files: the placed instances as JSON.
//!
//! ```text
//! {"events": [{"template_name", "frame", "time", "field_values": {name: value}}],
//!  "templates": [...]?}
//! ```
//!
//! `time` is informational (`frame / fps`) and never read back. The optional
//! `templates` section appears in files written by older exporters; its
//! templates are merged into the palette before the events are loaded.
//!
//! Import is destructive: once the document shape has been checked, every
//! instance and its marker is removed before the file's events are placed.
//! Entries are placed without the duplicate guard of interactive placement.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use cuemark_timeline::{MarkerStore, TimelineStore};
use cuemark_types::{
    EventInstance, FieldDefinition, FieldValue, Frame, Template, coerce_or_string, infer,
};

use crate::error::CodecError;
use crate::file::{read_json, write_json};
use crate::palette::{merge_templates, required_section};
use crate::report::{EntryProblem, ImportMode, ImportReport, Section};

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// An events document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsFile {
    /// Every instance, in creation order.
    pub events: Vec<EventRecord>,
}

/// One exported instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// Referenced template name.
    pub template_name: String,
    /// Timeline position.
    pub frame: Frame,
    /// `frame / fps`, in seconds.
    pub time: f64,
    /// Typed values by field name, in instance order. A name repeated on the
    /// instance is written once, with its first value.
    pub field_values: Map<String, JsonValue>,
}

impl EventRecord {
    /// Record for `instance` at `fps` frames per second.
    pub fn new(instance: &EventInstance, fps: u32) -> Self {
        let mut field_values = Map::new();
        for value in &instance.field_values {
            field_values
                .entry(value.name.clone())
                .or_insert_with(|| value.value.to_json());
        }
        Self {
            template_name: instance.template_name.clone(),
            frame: instance.frame,
            time: f64::from(instance.frame) / f64::from(fps),
            field_values,
        }
    }
}

/// Build the events document for every instance in the store.
pub fn export_events<M: MarkerStore>(store: &TimelineStore<M>) -> EventsFile {
    let fps = store.fps();
    EventsFile {
        events: store
            .instances()
            .iter()
            .map(|instance| EventRecord::new(instance, fps))
            .collect(),
    }
}

/// Export the events to `path`. Returns the number of events written.
pub fn save_events<M: MarkerStore>(
    store: &TimelineStore<M>,
    path: &Path,
) -> Result<usize, CodecError> {
    let document = export_events(store);
    write_json(path, &document)?;
    info!(path = %path.display(), events = document.events.len(), "events exported");
    Ok(document.events.len())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Replace the store's instances with the events of a parsed document.
///
/// Entries lacking `frame`, `template_name` or `field_values` (or holding
/// the wrong JSON type there) are reported and skipped; the rest of the file
/// still loads. Field values are converted to the kind the palette declares
/// for them, falling back to text when that fails. Fields the palette does
/// not know get a kind inferred from the JSON value.
pub fn import_events<M: MarkerStore>(
    store: &mut TimelineStore<M>,
    document: &JsonValue,
) -> Result<ImportReport, CodecError> {
    let events = required_section(document, "events", "events")?;
    let templates = match document.get("templates") {
        None | Some(JsonValue::Null) => &[][..],
        Some(_) => required_section(document, "templates", "events")?,
    };

    let cleared = store.clear_all();
    debug!(cleared, "existing events cleared before import");

    let mut report = ImportReport::default();
    let merged = merge_templates(store, templates, ImportMode::Merge, &mut report);
    report.templates_imported = merged;

    for (index, entry) in events.iter().enumerate() {
        match parse_event(store, entry) {
            Ok((template_name, frame, values)) => {
                store.push_imported(template_name, frame, values)?;
                report.imported = report.imported.saturating_add(1);
            }
            Err(problem) => {
                warn!(index, %problem, "event entry skipped");
                report.record(Section::Event, index, problem);
            }
        }
    }

    info!(
        imported = report.imported,
        templates = report.templates_imported,
        errors = report.errors.len(),
        "events imported"
    );
    Ok(report)
}

/// Read `path` and import it as an events file.
pub fn load_events<M: MarkerStore>(
    store: &mut TimelineStore<M>,
    path: &Path,
) -> Result<ImportReport, CodecError> {
    let document = read_json(path)?;
    import_events(store, &document)
}

fn parse_event<M: MarkerStore>(
    store: &TimelineStore<M>,
    entry: &JsonValue,
) -> Result<(String, Frame, Vec<FieldValue>), EntryProblem> {
    let object = entry.as_object().ok_or(EntryProblem::NotAnObject)?;
    let frame = object.get("frame").ok_or(EntryProblem::MissingKey("frame"))?;
    let template_name = object
        .get("template_name")
        .ok_or(EntryProblem::MissingKey("template_name"))?;
    let raw_values = object
        .get("field_values")
        .ok_or(EntryProblem::MissingKey("field_values"))?;

    let frame = frame
        .as_i64()
        .and_then(|f| Frame::try_from(f).ok())
        .ok_or(EntryProblem::WrongType {
            key: "frame",
            expected: "an integer frame",
        })?;
    let template_name = template_name.as_str().ok_or(EntryProblem::WrongType {
        key: "template_name",
        expected: "a string",
    })?;
    let raw_values = raw_values.as_object().ok_or(EntryProblem::WrongType {
        key: "field_values",
        expected: "an object",
    })?;

    let template = store.template_by_name(template_name);
    let values = raw_values
        .iter()
        .map(|(name, raw)| resolve_value(template, name, raw))
        .collect();
    Ok((template_name.to_owned(), frame, values))
}

/// Type one imported value: the palette's declared kind when there is one,
/// otherwise the kind implied by the JSON value.
fn resolve_value(template: Option<&Template>, name: &str, raw: &JsonValue) -> FieldValue {
    let declared = template
        .and_then(|t| t.field(name))
        .map(FieldDefinition::kind);
    let value = declared.map_or_else(
        || infer(raw),
        |kind| {
            let coerced = coerce_or_string(raw, kind);
            if let Some(err) = &coerced.fallback {
                debug!(field = name, error = %err, "value stored as text");
            }
            coerced.value
        },
    );
    FieldValue::new(name, value)
}
