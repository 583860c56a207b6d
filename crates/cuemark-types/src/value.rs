//! Typed field values and the coercion rules between them and raw JSON.
//!
//! Every field value in Cuemark is one of six kinds (see [`FieldKind`]).
//! Values arriving from JSON files are loosely typed, so all conversions go
//! through a single dispatch point, [`coerce`]:
//!
//! | Target kind | Accepts | Failure |
//! |-------------|---------|---------|
//! | `BOOL` | anything, by truthiness | never |
//! | `STRING` / `ENUM` | anything, stringified | never |
//! | `INT` / `FLOAT` | numbers, booleans, numeric text | non-numeric input |
//! | `ARRAY` | arrays (elements stringified and comma-joined) or scalars | never |
//!
//! Arrays are stored as a single comma-joined string. An element containing a
//! literal comma is therefore split in two on the next export.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::enums::FieldKind;

/// Separator of the internal array encoding.
pub const ARRAY_SEPARATOR: char = ',';

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A concrete, kind-tagged field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A `BOOL` value.
    Bool(bool),
    /// A `STRING` value.
    String(String),
    /// An `INT` value.
    Int(i64),
    /// A `FLOAT` value.
    Float(f64),
    /// An `ARRAY` value in its comma-joined encoding.
    Array(String),
    /// An `ENUM` selection.
    Enum(String),
}

impl Value {
    /// The canonical default for a kind: `false`, `""`, `0`, `0.0`, empty
    /// array, empty selection.
    pub const fn default_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Bool => Self::Bool(false),
            FieldKind::String => Self::String(String::new()),
            FieldKind::Int => Self::Int(0),
            FieldKind::Float => Self::Float(0.0),
            FieldKind::Array => Self::Array(String::new()),
            FieldKind::Enum => Self::Enum(String::new()),
        }
    }

    /// The kind this value belongs to.
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::String(_) => FieldKind::String,
            Self::Int(_) => FieldKind::Int,
            Self::Float(_) => FieldKind::Float,
            Self::Array(_) => FieldKind::Array,
            Self::Enum(_) => FieldKind::Enum,
        }
    }

    /// Array elements, split from the comma-joined encoding. Non-array
    /// values yield an empty list.
    pub fn array_items(&self) -> Vec<String> {
        match self {
            Self::Array(joined) => split_array(joined),
            _ => Vec::new(),
        }
    }

    /// The typed JSON form written to export files.
    ///
    /// Arrays are emitted as JSON arrays; a non-finite float becomes `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::String(s) | Self::Enum(s) => JsonValue::String(s.clone()),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => JsonValue::from(*f),
            Self::Array(joined) => JsonValue::Array(
                split_array(joined)
                    .into_iter()
                    .map(JsonValue::String)
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) | Self::Enum(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Array(joined) => write!(f, "[{joined}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// A raw value could not be converted into the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    /// The source is not a number and cannot be read as one.
    #[error("cannot convert {raw} to {kind}")]
    NotNumeric {
        /// The numeric kind that was requested.
        kind: FieldKind,
        /// The offending source, stringified.
        raw: String,
    },

    /// The source is numeric but does not fit the target.
    #[error("{raw} is out of range for {kind}")]
    OutOfRange {
        /// The numeric kind that was requested.
        kind: FieldKind,
        /// The offending source, stringified.
        raw: String,
    },
}

/// Convert a loosely typed JSON value into `kind`.
///
/// # Errors
///
/// Returns [`CoercionError`] when `kind` is `INT` or `FLOAT` and `raw` is
/// not numeric. All other kinds accept any input.
pub fn coerce(raw: &JsonValue, kind: FieldKind) -> Result<Value, CoercionError> {
    match kind {
        FieldKind::Bool => Ok(Value::Bool(truthy(raw))),
        FieldKind::String => Ok(Value::String(stringify(raw))),
        FieldKind::Enum => Ok(Value::Enum(stringify(raw))),
        FieldKind::Int => to_int(raw).map(Value::Int),
        FieldKind::Float => to_float(raw).map(Value::Float),
        FieldKind::Array => Ok(Value::Array(join_array(raw))),
    }
}

/// Result of [`coerce_or_string`].
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// The stored value.
    pub value: Value,
    /// The coercion failure that forced the string fallback, if any.
    pub fallback: Option<CoercionError>,
}

/// Convert `raw` into `kind`, degrading to a `STRING` value holding the
/// stringified source when the conversion fails.
pub fn coerce_or_string(raw: &JsonValue, kind: FieldKind) -> Coerced {
    match coerce(raw, kind) {
        Ok(value) => Coerced {
            value,
            fallback: None,
        },
        Err(err) => Coerced {
            value: Value::String(stringify(raw)),
            fallback: Some(err),
        },
    }
}

/// Derive a value from the JSON type alone, for fields no template declares.
///
/// `boolean` → `BOOL`, `string` → `STRING`, integer → `INT`, other numbers
/// → `FLOAT`, `array` → `ARRAY`, anything else → `STRING`.
pub fn infer(raw: &JsonValue) -> Value {
    match raw {
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().map_or_else(|| Value::String(n.to_string()), Value::Float),
            Value::Int,
        ),
        JsonValue::Array(_) => Value::Array(join_array(raw)),
        JsonValue::Null | JsonValue::Object(_) => Value::String(stringify(raw)),
    }
}

/// Truthiness of a JSON value: `null`, `false`, zero, and empty strings,
/// arrays and objects are false.
pub fn truthy(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

/// String form of a JSON value.
///
/// Strings are returned verbatim. `null` and booleans use the spellings
/// found in existing palette and events files (`None`, `True`, `False`);
/// numbers, arrays and objects use their compact JSON text.
pub fn stringify(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "None".to_owned(),
        JsonValue::Bool(true) => "True".to_owned(),
        JsonValue::Bool(false) => "False".to_owned(),
        other => other.to_string(),
    }
}

/// Comma-join an array (elements stringified) or stringify a scalar.
pub fn join_array(raw: &JsonValue) -> String {
    match raw {
        JsonValue::Array(items) => items
            .iter()
            .map(stringify)
            .collect::<Vec<_>>()
            .join(&ARRAY_SEPARATOR.to_string()),
        other => stringify(other),
    }
}

/// Split the comma-joined array encoding. The empty string is the empty list.
pub fn split_array(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        Vec::new()
    } else {
        joined.split(ARRAY_SEPARATOR).map(str::to_owned).collect()
    }
}

/// Parse an enum option source: split on commas, trim, drop empty entries.
pub fn parse_enum_options(source: &str) -> Vec<String> {
    source
        .split(ARRAY_SEPARATOR)
        .map(str::trim)
        .filter(|opt| !opt.is_empty())
        .map(str::to_owned)
        .collect()
}

fn to_int(raw: &JsonValue) -> Result<i64, CoercionError> {
    match raw {
        JsonValue::Bool(b) => Ok(i64::from(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            let f = n.as_f64().ok_or_else(|| out_of_range(FieldKind::Int, raw))?;
            truncate(f).ok_or_else(|| out_of_range(FieldKind::Int, raw))
        }
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_parse| not_numeric(FieldKind::Int, raw)),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(not_numeric(FieldKind::Int, raw))
        }
    }
}

fn to_float(raw: &JsonValue) -> Result<f64, CoercionError> {
    match raw {
        JsonValue::Bool(b) => Ok(f64::from(u8::from(*b))),
        JsonValue::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| out_of_range(FieldKind::Float, raw)),
        JsonValue::String(s) => {
            let parsed = s
                .trim()
                .parse::<f64>()
                .map_err(|_parse| not_numeric(FieldKind::Float, raw))?;
            // JSON has no spelling for NaN or infinities.
            if parsed.is_finite() {
                Ok(parsed)
            } else {
                Err(out_of_range(FieldKind::Float, raw))
            }
        }
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(not_numeric(FieldKind::Float, raw))
        }
    }
}

/// Truncate toward zero, rejecting values outside the `i64` range.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

fn not_numeric(kind: FieldKind, raw: &JsonValue) -> CoercionError {
    CoercionError::NotNumeric {
        kind,
        raw: stringify(raw),
    }
}

fn out_of_range(kind: FieldKind, raw: &JsonValue) -> CoercionError {
    CoercionError::OutOfRange {
        kind,
        raw: stringify(raw),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_match_kind() {
        for kind in FieldKind::ALL {
            assert_eq!(Value::default_for(kind).kind(), kind);
        }
        assert_eq!(Value::default_for(FieldKind::Int), Value::Int(0));
        assert_eq!(Value::default_for(FieldKind::Bool), Value::Bool(false));
    }

    #[test]
    fn bool_uses_truthiness() {
        assert_eq!(coerce(&json!(1), FieldKind::Bool).ok(), Some(Value::Bool(true)));
        assert_eq!(coerce(&json!(0.0), FieldKind::Bool).ok(), Some(Value::Bool(false)));
        assert_eq!(coerce(&json!(""), FieldKind::Bool).ok(), Some(Value::Bool(false)));
        assert_eq!(coerce(&json!("no"), FieldKind::Bool).ok(), Some(Value::Bool(true)));
        assert_eq!(coerce(&json!([]), FieldKind::Bool).ok(), Some(Value::Bool(false)));
        assert_eq!(coerce(&json!(null), FieldKind::Bool).ok(), Some(Value::Bool(false)));
    }

    #[test]
    fn string_and_enum_stringify_anything() {
        assert_eq!(
            coerce(&json!(12), FieldKind::String).ok(),
            Some(Value::String("12".to_owned()))
        );
        assert_eq!(
            coerce(&json!(true), FieldKind::String).ok(),
            Some(Value::String("True".to_owned()))
        );
        assert_eq!(
            coerce(&json!("heavy"), FieldKind::Enum).ok(),
            Some(Value::Enum("heavy".to_owned()))
        );
    }

    #[test]
    fn int_accepts_numbers_and_numeric_text() {
        assert_eq!(coerce(&json!(7), FieldKind::Int).ok(), Some(Value::Int(7)));
        assert_eq!(coerce(&json!(7.9), FieldKind::Int).ok(), Some(Value::Int(7)));
        assert_eq!(coerce(&json!(-7.9), FieldKind::Int).ok(), Some(Value::Int(-7)));
        assert_eq!(coerce(&json!(" 42 "), FieldKind::Int).ok(), Some(Value::Int(42)));
        assert_eq!(coerce(&json!(true), FieldKind::Int).ok(), Some(Value::Int(1)));
    }

    #[test]
    fn int_rejects_non_numeric_text() {
        let result = coerce(&json!("abc"), FieldKind::Int);
        assert!(matches!(
            result,
            Err(CoercionError::NotNumeric {
                kind: FieldKind::Int,
                ..
            })
        ));
        assert!(coerce(&json!("3.5"), FieldKind::Int).is_err());
        assert!(coerce(&json!(null), FieldKind::Int).is_err());
        assert!(coerce(&json!([1]), FieldKind::Int).is_err());
    }

    #[test]
    fn int_rejects_out_of_range_float() {
        let result = coerce(&json!(1e300), FieldKind::Int);
        assert!(matches!(result, Err(CoercionError::OutOfRange { .. })));
    }

    #[test]
    fn float_accepts_numbers_and_text() {
        assert_eq!(coerce(&json!(2), FieldKind::Float).ok(), Some(Value::Float(2.0)));
        assert_eq!(coerce(&json!("0.25"), FieldKind::Float).ok(), Some(Value::Float(0.25)));
        assert!(coerce(&json!("quick"), FieldKind::Float).is_err());
    }

    #[test]
    fn float_rejects_non_finite_text() {
        for text in ["nan", "NaN", "inf", "-inf", "infinity", "1e400"] {
            assert!(
                matches!(
                    coerce(&json!(text), FieldKind::Float),
                    Err(CoercionError::OutOfRange { .. })
                ),
                "{text}"
            );
        }
        let fallback = coerce_or_string(&json!("nan"), FieldKind::Float);
        assert_eq!(fallback.value, Value::String("nan".to_owned()));
        assert!(fallback.fallback.is_some());
        assert!(coerce(&json!("nan"), FieldKind::Int).is_err());
    }

    #[test]
    fn array_joins_elements() {
        assert_eq!(
            coerce(&json!(["a", 1, true]), FieldKind::Array).ok(),
            Some(Value::Array("a,1,True".to_owned()))
        );
        assert_eq!(
            coerce(&json!("solo"), FieldKind::Array).ok(),
            Some(Value::Array("solo".to_owned()))
        );
    }

    #[test]
    fn array_with_embedded_comma_is_lossy() {
        let stored = coerce(&json!(["a,b", "c"]), FieldKind::Array).ok();
        let items = stored.map(|v| v.array_items()).unwrap_or_default();
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn fallback_stores_raw_text() {
        let coerced = coerce_or_string(&json!("abc"), FieldKind::Int);
        assert_eq!(coerced.value, Value::String("abc".to_owned()));
        assert!(coerced.fallback.is_some());

        let coerced = coerce_or_string(&json!(5), FieldKind::Int);
        assert_eq!(coerced.value, Value::Int(5));
        assert!(coerced.fallback.is_none());
    }

    #[test]
    fn inference_follows_json_type() {
        assert_eq!(infer(&json!(false)), Value::Bool(false));
        assert_eq!(infer(&json!("x")), Value::String("x".to_owned()));
        assert_eq!(infer(&json!(3)), Value::Int(3));
        assert_eq!(infer(&json!(3.5)), Value::Float(3.5));
        assert_eq!(infer(&json!(["p", "q"])), Value::Array("p,q".to_owned()));
        assert_eq!(infer(&json!(null)), Value::String("None".to_owned()));
        assert_eq!(infer(&json!({"k": 1})), Value::String("{\"k\":1}".to_owned()));
    }

    #[test]
    fn array_exports_as_json_list() {
        assert_eq!(Value::Array("a,b".to_owned()).to_json(), json!(["a", "b"]));
        assert_eq!(Value::Array(String::new()).to_json(), json!([]));
        assert_eq!(Value::Int(10).to_json(), json!(10));
    }

    #[test]
    fn enum_options_are_trimmed_and_filtered() {
        assert_eq!(
            parse_enum_options(" light, heavy ,, crit ,"),
            vec!["light", "heavy", "crit"]
        );
        assert!(parse_enum_options("").is_empty());
    }
}
