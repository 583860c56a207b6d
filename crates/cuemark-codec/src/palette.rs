//! Palette files: the template collection as JSON.
//!
//! ```text
//! {"templates": [{"name", "description", "color": [r, g, b],
//!                 "custom_fields": [{"name", "type", "description",
//!                                    "default_value", "enum_options"?}]}]}
//! ```
//!
//! Export writes typed records. Import walks the raw document so that one
//! bad entry (or one bad field inside an entry) never costs the rest of the
//! file.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use cuemark_timeline::{MarkerStore, TimelineStore};
use cuemark_types::value::join_array;
use cuemark_types::{FieldDefinition, FieldKind, Rgb, Template, split_array};

use crate::error::CodecError;
use crate::file::{read_json, write_json};
use crate::report::{EntryProblem, ImportMode, ImportReport, Section};

// ---------------------------------------------------------------------------
// Export records
// ---------------------------------------------------------------------------

/// A palette document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteFile {
    /// Every template, in display order.
    pub templates: Vec<TemplateRecord>,
}

/// One exported template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateRecord {
    /// Template name.
    pub name: String,
    /// Template description.
    pub description: String,
    /// RGB color.
    pub color: Rgb,
    /// Field definitions, in order.
    pub custom_fields: Vec<FieldRecord>,
}

/// One exported field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    /// Field name.
    pub name: String,
    /// Upper-case kind tag.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Field description.
    pub description: String,
    /// Typed default. Arrays are written as JSON lists.
    pub default_value: JsonValue,
    /// Option list, written for `ENUM` fields only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<String>>,
}

impl From<&FieldDefinition> for FieldRecord {
    fn from(field: &FieldDefinition) -> Self {
        Self {
            name: field.name.clone(),
            kind: field.kind(),
            description: field.description.clone(),
            default_value: field.default_value().to_json(),
            enum_options: (field.kind() == FieldKind::Enum)
                .then(|| split_array(field.enum_options_source())),
        }
    }
}

impl From<&Template> for TemplateRecord {
    fn from(template: &Template) -> Self {
        Self {
            name: template.name.clone(),
            description: template.description.clone(),
            color: template.color,
            custom_fields: template.fields.iter().map(FieldRecord::from).collect(),
        }
    }
}

/// Build the palette document for every template in the store.
pub fn export_palette<M: MarkerStore>(store: &TimelineStore<M>) -> PaletteFile {
    PaletteFile {
        templates: store.templates().iter().map(TemplateRecord::from).collect(),
    }
}

/// Export the palette to `path`. Returns the number of templates written.
pub fn save_palette<M: MarkerStore>(
    store: &TimelineStore<M>,
    path: &Path,
) -> Result<usize, CodecError> {
    let document = export_palette(store);
    write_json(path, &document)?;
    info!(path = %path.display(), templates = document.templates.len(), "palette exported");
    Ok(document.templates.len())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Load templates from a parsed palette document.
///
/// Under [`ImportMode::Merge`] entries whose name is already taken are
/// skipped. Under [`ImportMode::Replace`] every template is dropped first,
/// and a name repeated inside the file overwrites its earlier entry in
/// place. The document shape is checked before the store is touched.
pub fn import_palette<M: MarkerStore>(
    store: &mut TimelineStore<M>,
    document: &JsonValue,
    mode: ImportMode,
) -> Result<ImportReport, CodecError> {
    let entries = required_section(document, "templates", "palette")?;

    if mode == ImportMode::Replace {
        store.clear_templates();
    }
    let mut report = ImportReport::default();
    let loaded = merge_templates(store, entries, mode, &mut report);
    report.imported = loaded;

    info!(
        ?mode,
        imported = report.imported,
        skipped = report.skipped,
        errors = report.errors.len(),
        "palette imported"
    );
    Ok(report)
}

/// Read `path` and import it as a palette.
pub fn load_palette<M: MarkerStore>(
    store: &mut TimelineStore<M>,
    path: &Path,
    mode: ImportMode,
) -> Result<ImportReport, CodecError> {
    let document = read_json(path)?;
    import_palette(store, &document, mode)
}

/// The list under `key`, or a [`CodecError::Malformed`] naming `kind`.
pub(crate) fn required_section<'a>(
    document: &'a JsonValue,
    key: &'static str,
    kind: &'static str,
) -> Result<&'a [JsonValue], CodecError> {
    let section = document.get(key).ok_or_else(|| CodecError::Malformed {
        kind,
        reason: format!("missing '{key}' section"),
    })?;
    section
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| CodecError::Malformed {
            kind,
            reason: format!("'{key}' must be a list"),
        })
}

/// Add template entries to the store. Returns how many were loaded.
pub(crate) fn merge_templates<M: MarkerStore>(
    store: &mut TimelineStore<M>,
    entries: &[JsonValue],
    mode: ImportMode,
    report: &mut ImportReport,
) -> usize {
    let mut loaded = 0_usize;

    for (index, entry) in entries.iter().enumerate() {
        let Some(object) = entry.as_object() else {
            report.record(Section::Template, index, EntryProblem::NotAnObject);
            report.skipped = report.skipped.saturating_add(1);
            continue;
        };
        let Some(name) = object.get("name").and_then(JsonValue::as_str) else {
            warn!(index, "template entry without a name skipped");
            report.record(Section::Template, index, EntryProblem::MissingKey("name"));
            report.skipped = report.skipped.saturating_add(1);
            continue;
        };

        let exists = store.template_by_name(name).is_some();
        if exists && mode == ImportMode::Merge {
            debug!(template = name, "template already exists, skipped");
            report.skipped = report.skipped.saturating_add(1);
            continue;
        }

        let parsed = parse_template(name, object, index, report);
        if exists {
            if let Some(existing) = store.template_by_name_mut(name) {
                debug!(template = name, "template overwritten in place");
                existing.description = parsed.description;
                existing.color = parsed.color;
                existing.fields = parsed.fields;
            }
        } else {
            store.push_template(parsed);
        }
        loaded = loaded.saturating_add(1);
    }
    loaded
}

fn parse_template(
    name: &str,
    object: &Map<String, JsonValue>,
    index: usize,
    report: &mut ImportReport,
) -> Template {
    let mut template = Template::new(name, Rgb::IMPORT_FALLBACK);
    template.description = text(object, "description");

    if let Some(raw) = object.get("color") {
        template.color = Rgb::from_json(raw).unwrap_or_else(|| {
            report.record(Section::Template, index, EntryProblem::MalformedColor);
            Rgb::IMPORT_FALLBACK
        });
    }

    match object.get("custom_fields") {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::Array(fields)) => {
            template.fields = fields
                .iter()
                .filter_map(|field| parse_field(field, index, report))
                .collect();
        }
        Some(_) => report.record(
            Section::Template,
            index,
            EntryProblem::WrongType {
                key: "custom_fields",
                expected: "a list",
            },
        ),
    }
    template
}

fn parse_field(
    entry: &JsonValue,
    index: usize,
    report: &mut ImportReport,
) -> Option<FieldDefinition> {
    let object = entry.as_object()?;
    let (Some(name), Some(tag)) = (
        object.get("name").and_then(JsonValue::as_str),
        object.get("type").and_then(JsonValue::as_str),
    ) else {
        debug!(index, "field entry without name or type skipped");
        return None;
    };

    let Ok(kind) = tag.parse::<FieldKind>() else {
        report.record(
            Section::Template,
            index,
            EntryProblem::UnknownFieldType {
                field: name.to_owned(),
                tag: tag.to_owned(),
            },
        );
        return None;
    };

    let mut field = FieldDefinition::new(name, kind);
    field.description = text(object, "description");

    if let Some(options) = object
        .get("enum_options")
        .filter(|v| kind == FieldKind::Enum && !v.is_null())
    {
        field.set_enum_options(join_array(options));
    }

    let rejected = object
        .get("default_value")
        .filter(|v| !v.is_null())
        .and_then(|raw| field.set_default(raw).err());
    if let Some(source) = rejected {
        warn!(field = name, error = %source, "default value ignored");
        report.record(
            Section::Template,
            index,
            EntryProblem::BadDefault {
                field: name.to_owned(),
                source,
            },
        );
    }
    Some(field)
}

fn text(object: &Map<String, JsonValue>, key: &str) -> String {
    object
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use cuemark_timeline::MarkerTrack;
    use cuemark_types::Value;

    use super::*;

    fn store() -> TimelineStore<MarkerTrack> {
        TimelineStore::new(MarkerTrack::new())
    }

    /// A palette exercising every kind.
    fn sample() -> TimelineStore<MarkerTrack> {
        let mut store = store();
        let mut hit = Template::new("Hit", Rgb([0.2, 0.4, 0.6]));
        hit.description = "A strike".to_owned();

        let mut power = FieldDefinition::new("power", FieldKind::Int);
        let _ = power.set_default(&json!(10));
        let mut crit = FieldDefinition::new("crit", FieldKind::Bool);
        let _ = crit.set_default(&json!(true));
        let mut scale = FieldDefinition::new("scale", FieldKind::Float);
        let _ = scale.set_default(&json!(1.5));
        let mut tags = FieldDefinition::new("tags", FieldKind::Array);
        let _ = tags.set_default(&json!(["a", "b"]));
        let mut weight = FieldDefinition::new("weight", FieldKind::Enum);
        weight.set_enum_options("light,heavy");
        let _ = weight.set_default(&json!("heavy"));
        let mut label = FieldDefinition::new("label", FieldKind::String);
        label.description = "shown in UI".to_owned();

        hit.fields = vec![power, crit, scale, tags, weight, label];
        store.push_template(hit);
        store.push_template(Template::new("Step", Rgb::NEW_TEMPLATE));
        store
    }

    fn to_json(document: &PaletteFile) -> JsonValue {
        serde_json::to_value(document).unwrap_or_default()
    }

    #[test]
    fn export_shape() {
        let document = to_json(&export_palette(&sample()));
        let hit = &document["templates"][0];
        assert_eq!(hit["name"], json!("Hit"));
        assert_eq!(hit["color"], json!([0.2, 0.4, 0.6]));
        assert_eq!(hit["custom_fields"][0]["type"], json!("INT"));
        assert_eq!(hit["custom_fields"][0]["default_value"], json!(10));
        assert_eq!(hit["custom_fields"][3]["default_value"], json!(["a", "b"]));
        assert_eq!(hit["custom_fields"][4]["enum_options"], json!(["light", "heavy"]));
        assert!(hit["custom_fields"][0].get("enum_options").is_none());
    }

    #[test]
    fn export_then_import_reproduces_templates() {
        let original = sample();
        let document = to_json(&export_palette(&original));

        let mut restored = store();
        let report = import_palette(&mut restored, &document, ImportMode::Replace);
        assert!(report.is_ok());
        assert_eq!(report.map(|r| r.imported).ok(), Some(2));

        assert_eq!(restored.templates().len(), original.templates().len());
        for (a, b) in original.templates().iter().zip(restored.templates()) {
            assert!(a.same_content(b), "{a:?} != {b:?}");
        }
    }

    #[test]
    fn merge_skips_existing_names() {
        let mut store = sample();
        let document = json!({"templates": [
            {"name": "Hit", "description": "ignored"},
            {"name": "Jump"},
        ]});
        let report = import_palette(&mut store, &document, ImportMode::Merge).unwrap_or_default();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            store.template_by_name("Hit").map(|t| t.description.as_str()),
            Some("A strike")
        );
        let jump = store.template_by_name("Jump");
        assert_eq!(jump.map(|t| t.color), Some(Rgb::IMPORT_FALLBACK));
    }

    #[test]
    fn replace_clears_and_overwrites_repeats_in_place() {
        let mut store = sample();
        let document = json!({"templates": [
            {"name": "A", "custom_fields": [{"name": "x", "type": "INT"}]},
            {"name": "B"},
            {"name": "A", "description": "second", "custom_fields": []},
        ]});
        let report = import_palette(&mut store, &document, ImportMode::Replace).unwrap_or_default();

        assert_eq!(report.imported, 3);
        let names: Vec<_> = store.templates().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        let a = store.template_by_name("A");
        assert_eq!(a.map(|t| t.description.as_str()), Some("second"));
        assert_eq!(a.map(|t| t.fields.len()), Some(0));
    }

    #[test]
    fn bad_entries_are_skipped_individually() {
        let mut store = store();
        let document = json!({"templates": [
            {"description": "no name"},
            {"name": "Hit", "color": "red", "custom_fields": [
                {"name": "power", "type": "INT", "default_value": "lots"},
                {"name": "mystery", "type": "VECTOR"},
                {"type": "BOOL"},
                {"name": "ok", "type": "bool", "default_value": 1},
            ]},
        ]});
        let report = import_palette(&mut store, &document, ImportMode::Merge).unwrap_or_default();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        let problems: Vec<_> = report.errors.iter().map(|e| (e.index, e.problem.clone())).collect();
        assert_eq!(problems.len(), 4);
        assert_eq!(problems.first().map(|p| p.0), Some(0));
        assert!(matches!(problems.get(1), Some((1, EntryProblem::MalformedColor))));
        assert!(matches!(problems.get(2), Some((1, EntryProblem::BadDefault { .. }))));
        assert!(matches!(problems.get(3), Some((1, EntryProblem::UnknownFieldType { .. }))));

        let hit = store.template_by_name("Hit");
        let fields: Vec<_> = hit
            .map(|t| t.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();
        assert_eq!(fields, vec!["power", "ok"]);
        let power = hit.and_then(|t| t.field("power")).map(|f| f.default_value().clone());
        assert_eq!(power, Some(Value::Int(0)));
        let ok = hit.and_then(|t| t.field("ok")).map(|f| f.default_value().clone());
        assert_eq!(ok, Some(Value::Bool(true)));
    }

    #[test]
    fn enum_options_accept_list_or_text() {
        let mut store = store();
        let document = json!({"templates": [{"name": "Swing", "custom_fields": [
            {"name": "a", "type": "ENUM", "enum_options": ["x", "y"]},
            {"name": "b", "type": "ENUM", "enum_options": "p, q"},
        ]}]});
        assert!(import_palette(&mut store, &document, ImportMode::Merge).is_ok());

        let swing = store.template_by_name("Swing");
        let a = swing.and_then(|t| t.field("a")).map(FieldDefinition::enum_options);
        let b = swing.and_then(|t| t.field("b")).map(FieldDefinition::enum_options);
        assert_eq!(a, Some(vec!["x".to_owned(), "y".to_owned()]));
        assert_eq!(b, Some(vec!["p".to_owned(), "q".to_owned()]));
    }

    #[test]
    fn missing_section_aborts_without_mutation() {
        let mut store = sample();
        let result = import_palette(&mut store, &json!({"events": []}), ImportMode::Replace);
        assert!(matches!(result, Err(CodecError::Malformed { .. })));
        assert_eq!(store.templates().len(), 2);
    }
}
