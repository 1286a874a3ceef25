//! Declarative field mapping from raw source elements to prospect documents
//!
//! Each source ships a static table of [`MappingRule`]s. A rule reads one or
//! more dotted paths from the raw element, coerces the value and writes it
//! to a (possibly dotted) target path in the normalized document.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use leadx_core::value::get_path;
use serde_json::{Map, Value};
use thiserror::Error;

/// Per-element mapping failure; the element is skipped, the import continues
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MappingError {
    #[error("missing field '{0}'")]
    Missing(&'static str),

    #[error("field '{path}' is not a valid {expected}")]
    Invalid { path: &'static str, expected: &'static str },

    #[error("element is not an object")]
    NotAnObject,

    #[error("normalized record rejected: {0}")]
    Shape(String),
}

/// How a value is read from the raw element
#[derive(Debug, Clone, Copy)]
pub enum Extract {
    /// String; numbers are stringified
    Text(&'static str),
    /// Whole number; numeric strings accepted
    Integer(&'static str),
    /// Decimal; numeric strings accepted
    Float(&'static str),
    /// Date or date-time in the given chrono format, stored as RFC 3339
    Date(&'static str, &'static str),
    /// Several scalars joined with a separator
    Concat(&'static [&'static str], &'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct MappingRule {
    pub target: &'static str,
    pub extract: Extract,
}

impl MappingRule {
    pub const fn new(target: &'static str, extract: Extract) -> Self {
        Self { target, extract }
    }
}

fn scalar_text(raw: &Value, path: &'static str) -> Result<String, MappingError> {
    match get_path(raw, path) {
        None | Some(Value::Null) => Err(MappingError::Missing(path)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(MappingError::Invalid { path, expected: "string" }),
    }
}

fn number(raw: &Value, path: &'static str, expected: &'static str) -> Result<f64, MappingError> {
    let invalid = MappingError::Invalid { path, expected };
    match get_path(raw, path) {
        None | Some(Value::Null) => Err(MappingError::Missing(path)),
        Some(Value::Number(n)) => n.as_f64().ok_or(invalid),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).ok_or(invalid),
        Some(_) => Err(invalid),
    }
}

fn parse_date(value: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(value, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(value, format)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl Extract {
    fn read(&self, raw: &Value) -> Result<Value, MappingError> {
        match *self {
            Extract::Text(path) => scalar_text(raw, path).map(Value::String),
            Extract::Integer(path) => {
                let n = number(raw, path, "integer")?;
                if n.fract() != 0.0 {
                    return Err(MappingError::Invalid { path, expected: "integer" });
                }
                Ok(Value::from(n as i64))
            }
            Extract::Float(path) => Ok(Value::from(number(raw, path, "number")?)),
            Extract::Date(path, format) => {
                let text = scalar_text(raw, path)?;
                parse_date(&text, format)
                    .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
                    .ok_or(MappingError::Invalid { path, expected: "date" })
            }
            Extract::Concat(paths, separator) => {
                let parts = paths
                    .iter()
                    .map(|path| scalar_text(raw, *path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::String(parts.join(separator)))
            }
        }
    }
}

/// Write `value` at a dotted path, creating intermediate objects
fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

/// Apply every rule; all rules are required
pub fn apply(rules: &[MappingRule], raw: &Value) -> Result<Map<String, Value>, MappingError> {
    if !raw.is_object() {
        return Err(MappingError::NotAnObject);
    }
    let mut document = Map::new();
    for rule in rules {
        insert_path(&mut document, rule.target, rule.extract.read(raw)?);
    }
    Ok(document)
}

/// Paginated ERP user directory (camelCase, flat hair/address objects)
pub const ERP: &[MappingRule] = &[
    MappingRule::new("external_id", Extract::Text("id")),
    MappingRule::new("first_name", Extract::Text("firstName")),
    MappingRule::new("last_name", Extract::Text("lastName")),
    MappingRule::new("email", Extract::Text("email")),
    MappingRule::new("phone", Extract::Text("phone")),
    MappingRule::new("gender", Extract::Text("gender")),
    MappingRule::new("age", Extract::Integer("age")),
    MappingRule::new("birth_date", Extract::Date("birthDate", "%Y-%m-%d")),
    MappingRule::new("image", Extract::Text("image")),
    MappingRule::new("blood_group", Extract::Text("bloodGroup")),
    MappingRule::new("height", Extract::Float("height")),
    MappingRule::new("weight", Extract::Float("weight")),
    MappingRule::new("eye_color", Extract::Text("eyeColor")),
    MappingRule::new("hair_color", Extract::Text("hair.color")),
    MappingRule::new("hair_type", Extract::Text("hair.type")),
    MappingRule::new("address.address", Extract::Text("address.address")),
    MappingRule::new("address.city", Extract::Text("address.city")),
    MappingRule::new("address.state", Extract::Text("address.state")),
    MappingRule::new("address.postal_code", Extract::Text("address.postalCode")),
    MappingRule::new("address.country", Extract::Text("address.country")),
    MappingRule::new("address.latitude", Extract::Float("address.coordinates.lat")),
    MappingRule::new("address.longitude", Extract::Float("address.coordinates.lng")),
];

/// Single-shot Küba people directory (nested name/dob/location objects)
pub const KUEBA: &[MappingRule] = &[
    MappingRule::new("external_id", Extract::Text("login.uuid")),
    MappingRule::new("first_name", Extract::Text("name.first")),
    MappingRule::new("last_name", Extract::Text("name.last")),
    MappingRule::new("email", Extract::Text("email")),
    MappingRule::new("phone", Extract::Text("phone")),
    MappingRule::new("gender", Extract::Text("gender")),
    MappingRule::new("age", Extract::Integer("dob.age")),
    MappingRule::new("birth_date", Extract::Date("dob.date", "%Y-%m-%dT%H:%M:%S%.3fZ")),
    MappingRule::new("image", Extract::Text("picture.large")),
    MappingRule::new(
        "address.address",
        Extract::Concat(&["location.street.name", "location.street.number"], " "),
    ),
    MappingRule::new("address.city", Extract::Text("location.city")),
    MappingRule::new("address.state", Extract::Text("location.state")),
    MappingRule::new("address.postal_code", Extract::Text("location.postcode")),
    MappingRule::new("address.country", Extract::Text("location.country")),
    MappingRule::new("address.latitude", Extract::Float("location.coordinates.latitude")),
    MappingRule::new("address.longitude", Extract::Float("location.coordinates.longitude")),
];
