//! Search criteria for building filter UIs
//!
//! For each enum field the distinct observed values are reported, for each
//! range field the observed minimum and maximum. Plain fields are listed
//! with no values so clients still see every filterable field.
//!
//! Each field is computed with its own pass over the projected records.
//! That keeps the code simple at the cost of re-reading the projection once
//! per field, which is fine for the handful of fields an entity declares.

use crate::schema::{FieldKind, FieldSchema};
use crate::value::{get_path, parse_datetime};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Criterion {
    /// Distinct values, sorted
    Values { values: Vec<Value> },
    /// Bounds; both null when no record carries a value
    Range { min: Value, max: Value },
}

/// Criteria keyed by field name
pub type SearchCriteria = BTreeMap<String, Criterion>;

/// Build criteria from projected records.
///
/// Output is fully determined by the multiset of values, so two calls on
/// the same record set produce identical results regardless of order.
pub fn build(schema: &FieldSchema, records: &[Value]) -> SearchCriteria {
    let mut criteria = SearchCriteria::new();
    for field in schema.iter() {
        let criterion = match field.kind {
            FieldKind::Enum => distinct_values(records, &field.name),
            FieldKind::Range => bounds(records, &field.name),
            FieldKind::Plain => Criterion::Values { values: Vec::new() },
        };
        criteria.insert(field.name.clone(), criterion);
    }
    criteria
}

fn distinct_values(records: &[Value], path: &str) -> Criterion {
    let mut values: Vec<Value> = records
        .iter()
        .filter_map(|record| get_path(record, path))
        .filter(|value| !is_falsy(value))
        .cloned()
        .collect();
    values.sort_by(total_order);
    // 1 and 1.0 compare equal under the sort order but not under PartialEq
    values.dedup_by(|a, b| total_order(a, b) == Ordering::Equal);
    Criterion::Values { values }
}

fn bounds(records: &[Value], path: &str) -> Criterion {
    let mut min: Option<&Value> = None;
    let mut max: Option<&Value> = None;
    for value in records.iter().filter_map(|record| get_path(record, path)) {
        if value.is_null() {
            continue;
        }
        if min.map_or(true, |current| natural_order(value, current) == Ordering::Less) {
            min = Some(value);
        }
        if max.map_or(true, |current| natural_order(value, current) == Ordering::Greater) {
            max = Some(value);
        }
    }
    Criterion::Range {
        min: min.cloned().unwrap_or(Value::Null),
        max: max.cloned().unwrap_or(Value::Null),
    }
}

/// Null, false, zero, empty and "0" carry no useful option for a picker
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn total_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Numeric, then chronological for date strings, then lexicographic
fn natural_order(a: &Value, b: &Value) -> Ordering {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if let (Some(x), Some(y)) = (parse_datetime(x), parse_datetime(y)) {
            return x.cmp(&y);
        }
    }
    total_order(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FieldSchema {
        FieldSchema::new()
            .enumeration("gender")
            .enumeration("address.city")
            .range("age")
            .range("birth_date")
            .plain("email")
    }

    fn records() -> Vec<Value> {
        vec![
            json!({"gender": "male", "age": 40, "birth_date": "1984-02-01T00:00:00Z", "address": {"city": "Zug"}}),
            json!({"gender": "female", "age": 22, "birth_date": "2002-11-30T00:00:00Z", "address": {"city": "Bern"}}),
            json!({"gender": "male", "age": null, "birth_date": "1999-06-15T00:00:00Z", "address": {"city": ""}}),
            json!({"gender": null, "age": 31}),
        ]
    }

    #[test]
    fn test_enum_values_are_distinct_sorted_and_truthy() {
        let criteria = build(&schema(), &records());
        assert_eq!(
            criteria["gender"],
            Criterion::Values { values: vec![json!("female"), json!("male")] }
        );
        assert_eq!(
            criteria["address.city"],
            Criterion::Values { values: vec![json!("Bern"), json!("Zug")] }
        );
    }

    #[test]
    fn test_range_bounds() {
        let criteria = build(&schema(), &records());
        assert_eq!(criteria["age"], Criterion::Range { min: json!(22), max: json!(40) });
        assert_eq!(
            criteria["birth_date"],
            Criterion::Range {
                min: json!("1984-02-01T00:00:00Z"),
                max: json!("2002-11-30T00:00:00Z"),
            }
        );
    }

    #[test]
    fn test_range_without_values_is_null() {
        let criteria = build(&schema(), &[json!({"gender": "male"})]);
        assert_eq!(criteria["age"], Criterion::Range { min: Value::Null, max: Value::Null });
    }

    #[test]
    fn test_plain_fields_have_empty_values() {
        let criteria = build(&schema(), &records());
        assert_eq!(criteria["email"], Criterion::Values { values: vec![] });
        assert_eq!(criteria.len(), 5);
        assert_eq!(
            serde_json::to_value(&criteria["email"]).unwrap(),
            json!({"values": []})
        );
    }

    #[test]
    fn test_integer_and_float_forms_collapse() {
        let records = vec![json!({"size": 1}), json!({"size": 2.5}), json!({"size": 1.0}), json!({"size": 1})];
        let criteria = build(&FieldSchema::new().enumeration("size"), &records);
        assert_eq!(criteria["size"], Criterion::Values { values: vec![json!(1), json!(2.5)] });
    }

    #[test]
    fn test_output_is_independent_of_record_order() {
        let mut reversed = records();
        reversed.reverse();
        let a = serde_json::to_string(&build(&schema(), &records())).unwrap();
        let b = serde_json::to_string(&build(&schema(), &reversed)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serialized_shape() {
        let criteria = build(&FieldSchema::new().enumeration("gender").range("age"), &records());
        assert_eq!(
            serde_json::to_value(&criteria).unwrap(),
            json!({
                "age": {"min": 22, "max": 40},
                "gender": {"values": ["female", "male"]}
            })
        );
    }
}
