//! Core entity structs: templates, their field definitions, and the event
//! instances placed on the timeline.
//!
//! Ownership follows the data model strictly. A [`Template`] owns its
//! [`FieldDefinition`]s, an [`EventInstance`] owns its [`FieldValue`]s, and
//! an instance refers to its template only by name. Field values are owned
//! snapshots: editing a template never reaches into existing instances.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::enums::FieldKind;
use crate::ids::{InstanceId, TemplateId};
use crate::value::{CoercionError, Value, coerce, parse_enum_options};

/// A timeline position, in frames.
pub type Frame = i32;

/// Name of the marker that mirrors an instance of `template_name` at `frame`.
pub fn marker_name_for(template_name: &str, frame: Frame) -> String {
    format!("{template_name}_{frame}")
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGB color with components in `[0, 1]`, serialized as a 3-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub [f64; 3]);

impl Rgb {
    /// Orange, the color given to freshly added templates.
    pub const NEW_TEMPLATE: Self = Self([1.0, 0.5, 0.0]);

    /// Red, the color assumed for imported templates without one.
    pub const IMPORT_FALLBACK: Self = Self([1.0, 0.0, 0.0]);

    /// Build a color, clamping each component into `[0, 1]`.
    /// A NaN component becomes `0.0`.
    pub const fn clamped(r: f64, g: f64, b: f64) -> Self {
        Self([unit(r), unit(g), unit(b)])
    }

    /// Read a color from a JSON array of three numbers.
    pub fn from_json(raw: &JsonValue) -> Option<Self> {
        let items = raw.as_array()?;
        match items.as_slice() {
            [r, g, b] => Some(Self::clamped(r.as_f64()?, g.as_f64()?, b.as_f64()?)),
            _ => None,
        }
    }
}

const fn unit(component: f64) -> f64 {
    if component.is_nan() {
        0.0
    } else {
        component.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Field definition
// ---------------------------------------------------------------------------

/// One custom field declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name. Lookups resolve to the first definition with a given name.
    pub name: String,
    /// Declared kind.
    kind: FieldKind,
    /// Default value, always of kind `kind`.
    default: Value,
    /// Comma-separated option source for `ENUM` fields, kept verbatim so
    /// palette exports reproduce it exactly.
    enum_options: String,
    /// Free-form description.
    pub description: String,
}

impl FieldDefinition {
    /// A field of `kind` with the kind's canonical default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Value::default_for(kind),
            enum_options: String::new(),
            description: String::new(),
        }
    }

    /// Declared kind.
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Stored default value.
    pub const fn default_value(&self) -> &Value {
        &self.default
    }

    /// Raw comma-separated option source.
    pub fn enum_options_source(&self) -> &str {
        &self.enum_options
    }

    /// Parsed option list (trimmed, empty entries dropped).
    pub fn enum_options(&self) -> Vec<String> {
        parse_enum_options(&self.enum_options)
    }

    /// Change the declared kind. The default resets to the new kind's
    /// canonical default unless the kind is unchanged.
    pub fn set_kind(&mut self, kind: FieldKind) {
        if self.kind != kind {
            self.kind = kind;
            self.default = Value::default_for(kind);
        }
    }

    /// Replace the default by coercing `raw` into the declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError`] if `raw` does not fit the declared kind; the
    /// previous default is kept.
    pub fn set_default(&mut self, raw: &JsonValue) -> Result<(), CoercionError> {
        self.default = coerce(raw, self.kind)?;
        Ok(())
    }

    /// Replace the option source for an `ENUM` field.
    pub fn set_enum_options(&mut self, source: impl Into<String>) {
        self.enum_options = source.into();
    }

    /// The value a fresh instance receives for this field.
    ///
    /// This is the stored default, except that an `ENUM` with an empty
    /// default selects its first option.
    pub fn snapshot(&self) -> FieldValue {
        let value = match &self.default {
            Value::Enum(selected) if selected.is_empty() => Value::Enum(
                self.enum_options().into_iter().next().unwrap_or_default(),
            ),
            other => other.clone(),
        };
        FieldValue {
            name: self.name.clone(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Field value
// ---------------------------------------------------------------------------

/// A typed value bound to a field name on one instance.
///
/// The kind is carried by the value itself, captured when the value was
/// created. It outlives later edits to (or removal of) the definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Name of the definition this value was instantiated from.
    pub name: String,
    /// The value.
    pub value: Value,
}

impl FieldValue {
    /// Bind `value` to `name`.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Snapshotted kind.
    pub const fn kind(&self) -> FieldKind {
        self.value.kind()
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A named, colored bundle of field definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Stable id inside the store.
    pub id: TemplateId,
    /// Display name; instances refer to the template by this name.
    pub name: String,
    /// Identification color.
    pub color: Rgb,
    /// Free-form description.
    pub description: String,
    /// Ordered field definitions.
    pub fields: Vec<FieldDefinition>,
}

impl Template {
    /// A template with no fields.
    pub fn new(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            color,
            description: String::new(),
            fields: Vec::new(),
        }
    }

    /// First field definition named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Mutable access to the first field definition named `name`.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Fresh field values for a new instance, one per definition, in order.
    pub fn snapshot_values(&self) -> Vec<FieldValue> {
        self.fields.iter().map(FieldDefinition::snapshot).collect()
    }

    /// Same name, color, description and fields, ignoring the id.
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.color == other.color
            && self.description == other.description
            && self.fields == other.fields
    }
}

// ---------------------------------------------------------------------------
// Event instance
// ---------------------------------------------------------------------------

/// A template placed at a frame, mirrored by one external marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInstance {
    /// Stable id inside the store.
    pub id: InstanceId,
    /// Name of the referenced template. May dangle.
    pub template_name: String,
    /// Timeline position.
    pub frame: Frame,
    /// Name of the mirroring marker, `"{template_name}_{frame}"` when stable.
    pub marker_name: String,
    /// Owned field values.
    pub field_values: Vec<FieldValue>,
}

impl EventInstance {
    /// An instance whose marker name is derived from template and frame.
    pub fn new(
        template_name: impl Into<String>,
        frame: Frame,
        field_values: Vec<FieldValue>,
    ) -> Self {
        let template_name = template_name.into();
        let marker_name = marker_name_for(&template_name, frame);
        Self {
            id: InstanceId::new(),
            template_name,
            frame,
            marker_name,
            field_values,
        }
    }

    /// The marker name implied by the current template name and frame.
    pub fn expected_marker_name(&self) -> String {
        marker_name_for(&self.template_name, self.frame)
    }

    /// First field value named `name`.
    pub fn field_value(&self, name: &str) -> Option<&FieldValue> {
        self.field_values.iter().find(|v| v.name == name)
    }

    /// Whether this instance occupies `(template_name, frame)`.
    pub fn occupies(&self, template_name: &str, frame: Frame) -> bool {
        self.frame == frame && self.template_name == template_name
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hit_template() -> Template {
        let mut template = Template::new("Hit", Rgb::NEW_TEMPLATE);
        let mut power = FieldDefinition::new("power", FieldKind::Int);
        let _ = power.set_default(&json!(10));
        template.fields.push(power);
        template
    }

    #[test]
    fn clamped_color_is_always_in_unit_range() {
        let color = Rgb::clamped(f64::NAN, f64::INFINITY, -0.5);
        assert_eq!(color.0.map(|c| c.to_bits()), [0.0_f64, 1.0, 0.0].map(f64::to_bits));
        assert!(color.0.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn marker_name_joins_template_and_frame() {
        assert_eq!(marker_name_for("Hit", 24), "Hit_24");
        assert_eq!(marker_name_for("", -3), "_-3");
    }

    #[test]
    fn new_instance_mirrors_marker_name() {
        let instance = EventInstance::new("Hit", 24, Vec::new());
        assert_eq!(instance.marker_name, "Hit_24");
        assert_eq!(instance.expected_marker_name(), instance.marker_name);
    }

    #[test]
    fn snapshot_copies_kind_and_default() {
        let values = hit_template().snapshot_values();
        assert_eq!(values, vec![FieldValue::new("power", Value::Int(10))]);
    }

    #[test]
    fn snapshot_is_decoupled_from_later_edits() {
        let mut template = hit_template();
        let values = template.snapshot_values();
        if let Some(field) = template.field_mut("power") {
            field.set_kind(FieldKind::String);
        }
        assert_eq!(values.first().map(FieldValue::kind), Some(FieldKind::Int));
    }

    #[test]
    fn enum_snapshot_falls_back_to_first_option() {
        let mut weight = FieldDefinition::new("weight", FieldKind::Enum);
        weight.set_enum_options("light, heavy");
        assert_eq!(weight.snapshot().value, Value::Enum("light".to_owned()));

        let _ = weight.set_default(&json!("heavy"));
        assert_eq!(weight.snapshot().value, Value::Enum("heavy".to_owned()));
    }

    #[test]
    fn set_kind_resets_default() {
        let mut field = FieldDefinition::new("f", FieldKind::Int);
        let _ = field.set_default(&json!(4));
        field.set_kind(FieldKind::Int);
        assert_eq!(field.default_value(), &Value::Int(4));
        field.set_kind(FieldKind::Bool);
        assert_eq!(field.default_value(), &Value::Bool(false));
    }

    #[test]
    fn rejected_default_keeps_previous() {
        let mut field = FieldDefinition::new("f", FieldKind::Float);
        let _ = field.set_default(&json!(1.5));
        assert!(field.set_default(&json!("fast")).is_err());
        assert_eq!(field.default_value(), &Value::Float(1.5));
    }

    #[test]
    fn duplicate_field_names_resolve_to_first() {
        let mut template = Template::new("T", Rgb::NEW_TEMPLATE);
        template.fields.push(FieldDefinition::new("x", FieldKind::Int));
        template.fields.push(FieldDefinition::new("x", FieldKind::Bool));
        assert_eq!(template.field("x").map(FieldDefinition::kind), Some(FieldKind::Int));
    }

    #[test]
    fn color_parses_and_clamps() {
        assert_eq!(Rgb::from_json(&json!([0.2, 2, -1])), Some(Rgb([0.2, 1.0, 0.0])));
        assert_eq!(Rgb::from_json(&json!([0.2, 0.3])), None);
        assert_eq!(Rgb::from_json(&json!("red")), None);
    }
}
