//! Typed filter operands and the cast-kind registry.
//!
//! Raw filter values arrive as loosely typed JSON (usually strings from a
//! query string). A [`CastKind`] declared per field turns them into a
//! [`TypedValue`] that can be compared against stored JSON documents.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// A filter operand after coercion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    List(Vec<TypedValue>),
}

impl TypedValue {
    /// Pass-through conversion used when no cast applies
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => TypedValue::Null,
            Value::Bool(b) => TypedValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => TypedValue::Integer(i),
                None => TypedValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => TypedValue::Text(s.clone()),
            Value::Array(items) => TypedValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => TypedValue::Text(value.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        TypedValue::Text(value.into())
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Integer(i) => Some(*i as f64),
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Ordering of a stored value relative to this operand.
    ///
    /// Returns `None` when the two sides are not comparable (different
    /// types, unparsable dates, lists).
    pub fn compare_stored(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (TypedValue::Null, Value::Null) => Some(Ordering::Equal),
            (TypedValue::Bool(a), Value::Bool(b)) => Some(b.cmp(a)),
            (TypedValue::Integer(a), Value::Number(n)) => match n.as_i64() {
                Some(b) => Some(b.cmp(a)),
                None => n.as_f64()?.partial_cmp(&(*a as f64)),
            },
            (TypedValue::Float(_), Value::Number(n)) => n.as_f64()?.partial_cmp(&self.as_f64()?),
            (TypedValue::Text(a), Value::String(b)) => Some(b.as_str().cmp(a.as_str())),
            (TypedValue::DateTime(a), Value::String(b)) => Some(parse_datetime(b)?.cmp(a)),
            _ => None,
        }
    }

    /// Equality against a stored value; an absent field only equals `Null`
    pub fn matches_stored(&self, stored: Option<&Value>) -> bool {
        match stored {
            None => matches!(self, TypedValue::Null),
            Some(value) => self.compare_stored(value) == Some(Ordering::Equal),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CastError {
    #[error("'{value}' is not a member of {enum_name}")]
    UnknownMember { enum_name: &'static str, value: String },

    #[error("{enum_name} expects a scalar value")]
    NotScalar { enum_name: &'static str },
}

/// A closed set of string-backed values usable as a filter cast
pub trait EnumValue: Sized + 'static {
    const NAME: &'static str;

    fn from_value(value: &str) -> Option<Self>;

    fn as_value(&self) -> &'static str;
}

fn enum_member<E: EnumValue>(value: &str) -> Option<&'static str> {
    E::from_value(value).map(|member| member.as_value())
}

/// Enum coercion resolved when the cast table is built
#[derive(Debug, Clone, Copy)]
pub struct EnumCast {
    name: &'static str,
    member: fn(&str) -> Option<&'static str>,
}

impl EnumCast {
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn coerce(&self, raw: &Value) -> Result<TypedValue, CastError> {
        let value = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return Err(CastError::NotScalar { enum_name: self.name }),
        };
        (self.member)(&value)
            .map(TypedValue::text)
            .ok_or(CastError::UnknownMember { enum_name: self.name, value })
    }
}

/// How a raw filter value is coerced for a given field
#[derive(Debug, Clone, Copy, Default)]
pub enum CastKind {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Enum(EnumCast),
}

impl CastKind {
    /// Cast backed by an [`EnumValue`] type
    pub fn enumeration<E: EnumValue>() -> Self {
        CastKind::Enum(EnumCast {
            name: E::NAME,
            member: enum_member::<E>,
        })
    }

    /// Coerce a single raw value.
    ///
    /// Numeric and date casts fall back to the raw value when it does not
    /// parse. Only an enum cast can fail.
    pub fn coerce(&self, raw: &Value) -> Result<TypedValue, CastError> {
        let typed = match self {
            CastKind::String => TypedValue::from_json(raw),
            CastKind::Integer => match raw {
                Value::Number(n) => match n.as_i64() {
                    Some(i) => TypedValue::Integer(i),
                    None => TypedValue::Integer(n.as_f64().unwrap_or_default().trunc() as i64),
                },
                Value::String(s) => match parse_number(s) {
                    Some(Number::Int(i)) => TypedValue::Integer(i),
                    Some(Number::Float(f)) => TypedValue::Integer(f.trunc() as i64),
                    None => TypedValue::from_json(raw),
                },
                _ => TypedValue::from_json(raw),
            },
            CastKind::Float => match raw {
                Value::Number(n) => TypedValue::Float(n.as_f64().unwrap_or_default()),
                Value::String(s) => match parse_number(s) {
                    Some(Number::Int(i)) => TypedValue::Float(i as f64),
                    Some(Number::Float(f)) => TypedValue::Float(f),
                    None => TypedValue::from_json(raw),
                },
                _ => TypedValue::from_json(raw),
            },
            CastKind::Boolean => TypedValue::Bool(is_truthy(raw)),
            CastKind::Date | CastKind::DateTime => {
                let parsed = match raw {
                    Value::String(s) => parse_datetime(s),
                    Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
                    _ => None,
                };
                parsed
                    .map(TypedValue::DateTime)
                    .unwrap_or_else(|| TypedValue::from_json(raw))
            }
            CastKind::Enum(cast) => return cast.coerce(raw),
        };
        Ok(typed)
    }

    /// Coerce every element of a sequence (a scalar counts as one element).
    ///
    /// Elements that fail coercion are passed through unchanged instead of
    /// failing the whole sequence.
    pub fn coerce_each(&self, raw: &Value) -> Vec<TypedValue> {
        let coerce = |item: &Value| self.coerce(item).unwrap_or_else(|_| TypedValue::from_json(item));
        match raw {
            Value::Array(items) => items.iter().map(coerce).collect(),
            other => vec![coerce(other)],
        }
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::Int(i));
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Number::Float)
}

/// Permissive boolean parsing for query-string flags
pub fn is_truthy(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}

/// Parse the date and date-time shapes seen in filters and stored records
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    }
    None
}

/// Read a dotted path (`address.city`) out of a JSON document
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    enum Color {
        Red,
        Blue,
    }

    impl EnumValue for Color {
        const NAME: &'static str = "Color";

        fn from_value(value: &str) -> Option<Self> {
            match value {
                "red" => Some(Color::Red),
                "blue" => Some(Color::Blue),
                _ => None,
            }
        }

        fn as_value(&self) -> &'static str {
            match self {
                Color::Red => "red",
                Color::Blue => "blue",
            }
        }
    }

    #[test]
    fn test_integer_cast() {
        assert_eq!(CastKind::Integer.coerce(&json!("18")).unwrap(), TypedValue::Integer(18));
        assert_eq!(CastKind::Integer.coerce(&json!("18.7")).unwrap(), TypedValue::Integer(18));
        assert_eq!(CastKind::Integer.coerce(&json!(" 42 ")).unwrap(), TypedValue::Integer(42));
        assert_eq!(CastKind::Integer.coerce(&json!("abc")).unwrap(), TypedValue::text("abc"));
    }

    #[test]
    fn test_float_cast() {
        assert_eq!(CastKind::Float.coerce(&json!("1.75")).unwrap(), TypedValue::Float(1.75));
        assert_eq!(CastKind::Float.coerce(&json!("2")).unwrap(), TypedValue::Float(2.0));
        assert_eq!(CastKind::Float.coerce(&json!("tall")).unwrap(), TypedValue::text("tall"));
    }

    #[test]
    fn test_boolean_cast() {
        for truthy in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(CastKind::Boolean.coerce(&json!(truthy)).unwrap(), TypedValue::Bool(true));
        }
        for falsy in ["false", "0", "no", "off", "maybe", ""] {
            assert_eq!(CastKind::Boolean.coerce(&json!(falsy)).unwrap(), TypedValue::Bool(false));
        }
    }

    #[test]
    fn test_date_cast() {
        let expected = Utc.with_ymd_and_hms(1996, 5, 30, 0, 0, 0).unwrap();
        assert_eq!(CastKind::Date.coerce(&json!("1996-05-30")).unwrap(), TypedValue::DateTime(expected));
        assert_eq!(
            CastKind::DateTime.coerce(&json!("1996-05-30T00:00:00.000Z")).unwrap(),
            TypedValue::DateTime(expected)
        );
        assert_eq!(CastKind::Date.coerce(&json!("soon")).unwrap(), TypedValue::text("soon"));
    }

    #[test]
    fn test_enum_cast_single_value_fails_on_unknown_member() {
        let cast = CastKind::enumeration::<Color>();
        assert_eq!(cast.coerce(&json!("red")).unwrap(), TypedValue::text("red"));
        assert!(matches!(
            cast.coerce(&json!("green")),
            Err(CastError::UnknownMember { enum_name: "Color", .. })
        ));
    }

    #[test]
    fn test_enum_cast_sequence_passes_unknown_members_through() {
        let cast = CastKind::enumeration::<Color>();
        let values = cast.coerce_each(&json!(["blue", "green"]));
        assert_eq!(values, vec![TypedValue::text("blue"), TypedValue::text("green")]);
    }

    #[test]
    fn test_compare_stored() {
        assert_eq!(TypedValue::Integer(30).compare_stored(&json!(31)), Some(Ordering::Greater));
        assert_eq!(TypedValue::Float(1.5).compare_stored(&json!(1)), Some(Ordering::Less));
        assert_eq!(TypedValue::text("b").compare_stored(&json!("a")), Some(Ordering::Less));
        assert_eq!(TypedValue::Integer(30).compare_stored(&json!("30")), None);

        let cutoff = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            TypedValue::DateTime(cutoff).compare_stored(&json!("1999-12-31T00:00:00Z")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_get_path() {
        let doc = json!({"address": {"city": "Lucerne"}, "age": 30});
        assert_eq!(get_path(&doc, "address.city"), Some(&json!("Lucerne")));
        assert_eq!(get_path(&doc, "age"), Some(&json!(30)));
        assert_eq!(get_path(&doc, "address.zip"), None);
        assert_eq!(get_path(&doc, "age.value"), None);
    }
}
