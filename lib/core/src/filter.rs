// Key-based filter compilation and execution
use crate::record::Record;
use crate::schema::{CastTable, FieldKind, FieldSchema};
use crate::value::{get_path, TypedValue};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

/// Flat mapping of filter keys to raw values, in request order
pub type RawFilters = serde_json::Map<String, Value>;

pub trait Filter {
    fn matches(&self, record: &Record) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Gte,
    Lte,
    In,
    NotIn,
}

impl Operator {
    /// Split a filter key into its operator and base field.
    ///
    /// `min_<f>` and `max_<f>` are checked before the `_not_in` and `_in`
    /// suffixes.
    pub fn parse_key(key: &str) -> (Operator, &str) {
        if let Some(base) = key.strip_prefix("min_") {
            (Operator::Gte, base)
        } else if let Some(base) = key.strip_prefix("max_") {
            (Operator::Lte, base)
        } else if let Some(base) = key.strip_suffix("_not_in") {
            (Operator::NotIn, base)
        } else if let Some(base) = key.strip_suffix("_in") {
            (Operator::In, base)
        } else {
            (Operator::Eq, key)
        }
    }

    pub fn is_range(self) -> bool {
        matches!(self, Operator::Gte | Operator::Lte)
    }
}

/// A single typed predicate on one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterClause {
    pub field: String,
    pub operator: Operator,
    pub value: TypedValue,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, operator: Operator, value: TypedValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: TypedValue) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn not_in(field: impl Into<String>, values: Vec<TypedValue>) -> Self {
        Self::new(field, Operator::NotIn, TypedValue::List(values))
    }

    fn members(&self) -> &[TypedValue] {
        match &self.value {
            TypedValue::List(values) => values,
            single => std::slice::from_ref(single),
        }
    }

    /// Evaluate this clause against a JSON document
    pub fn matches_payload(&self, payload: &Value) -> bool {
        let stored = get_path(payload, &self.field);
        match self.operator {
            Operator::Eq => self.value.matches_stored(stored),
            Operator::Gte => stored
                .and_then(|v| self.value.compare_stored(v))
                .map_or(false, |ord| ord != Ordering::Less),
            Operator::Lte => stored
                .and_then(|v| self.value.compare_stored(v))
                .map_or(false, |ord| ord != Ordering::Greater),
            Operator::In => self.members().iter().any(|v| v.matches_stored(stored)),
            Operator::NotIn => !self.members().iter().any(|v| v.matches_stored(stored)),
        }
    }
}

impl Filter for FilterClause {
    fn matches(&self, record: &Record) -> bool {
        self.matches_payload(&record.payload)
    }
}

impl Filter for [FilterClause] {
    fn matches(&self, record: &Record) -> bool {
        self.iter().all(|clause| clause.matches(record))
    }
}

impl Filter for Vec<FilterClause> {
    fn matches(&self, record: &Record) -> bool {
        self.as_slice().matches(record)
    }
}

/// Store-side predicate composed from clauses
#[derive(Debug, Clone)]
pub enum Condition {
    Clause(FilterClause),
    /// Field is present and not null
    Exists(String),
    And(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Matches every record
    pub fn any() -> Self {
        Condition::And(Vec::new())
    }

    pub fn all(clauses: Vec<FilterClause>) -> Self {
        Condition::And(clauses.into_iter().map(Condition::Clause).collect())
    }

    pub fn eq(field: impl Into<String>, value: TypedValue) -> Self {
        Condition::Clause(FilterClause::eq(field, value))
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Condition::Exists(field.into())
    }

    fn matches_payload(&self, payload: &Value) -> bool {
        match self {
            Condition::Clause(clause) => clause.matches_payload(payload),
            Condition::Exists(field) => get_path(payload, field).map_or(false, |v| !v.is_null()),
            Condition::And(conditions) => conditions.iter().all(|c| c.matches_payload(payload)),
            Condition::Not(condition) => !condition.matches_payload(payload),
        }
    }
}

impl Filter for Condition {
    fn matches(&self, record: &Record) -> bool {
        self.matches_payload(&record.payload)
    }
}

/// Resolve a base field against the schema.
///
/// Transports that rewrite dots to underscores turn `address.city` into
/// `address_city`; when the verbatim name is unknown the all-dots form is
/// tried instead. Mixed `_`/`.` spellings are not reconstructed.
fn resolve_field<'s>(schema: &'s FieldSchema, base: &str) -> Option<&'s str> {
    let lookup = |name: &str| schema.iter().find(|f| f.name == name).map(|f| f.name.as_str());
    lookup(base).or_else(|| {
        if base.contains('_') {
            lookup(&base.replace('_', "."))
        } else {
            None
        }
    })
}

fn compile_key(schema: &FieldSchema, casts: &CastTable, key: &str, raw: &Value) -> Option<FilterClause> {
    let (operator, base) = Operator::parse_key(key);

    let Some(field) = resolve_field(schema, base) else {
        debug!(key, "ignoring filter on unknown field");
        return None;
    };

    if schema.kind(field) == Some(FieldKind::Enum) && operator.is_range() {
        debug!(key, field, "ignoring range filter on enum field");
        return None;
    }

    let cast = casts.get(field);
    let value = match operator {
        Operator::In | Operator::NotIn => TypedValue::List(cast.coerce_each(raw)),
        Operator::Eq | Operator::Gte | Operator::Lte => match cast.coerce(raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(key, field, error = %err, "ignoring filter with uncoercible value");
                return None;
            }
        },
    };

    Some(FilterClause::new(field, operator, value))
}

/// Compile raw filter keys into typed clauses.
///
/// Never fails: unknown fields, range bounds on enum fields and enum values
/// that match no member are dropped. The resulting clauses are AND-ed.
pub fn compile(schema: &FieldSchema, filters: &RawFilters, casts: &CastTable) -> Vec<FilterClause> {
    filters
        .iter()
        .filter_map(|(key, raw)| compile_key(schema, casts, key, raw))
        .collect()
}
