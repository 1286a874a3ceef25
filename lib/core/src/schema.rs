//! Filterable field declarations
//!
//! Every entity that can be queried through the generic filter entry point
//! declares a [`FieldSchema`] (which fields are filterable and how they
//! behave) and a [`CastTable`] (how raw values for those fields are
//! coerced). Both are plain values owned by the entity's module.

use crate::value::CastKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic kind of a filterable field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Closed set of values; supports equality and set membership only
    Enum,
    /// Ordered values; supports `min_`/`max_` bounds
    Range,
    Plain,
}

/// A single filterable field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDef {
    /// Plain name or dotted path (e.g. `address.city`)
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    /// First segment of a dotted path
    pub fn root(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

/// Ordered declaration of an entity's filterable fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
        });
        self
    }

    #[must_use]
    pub fn enumeration(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Enum)
    }

    #[must_use]
    pub fn range(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Range)
    }

    #[must_use]
    pub fn plain(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Plain)
    }

    /// Kind of a field, if it is declared
    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Distinct top-level roots in declaration order.
    ///
    /// `address.city` and `address.country` both project `address`.
    pub fn roots(&self) -> Vec<&str> {
        let mut roots: Vec<&str> = Vec::new();
        for field in &self.fields {
            let root = field.root();
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }

    /// Check the declaration for mistakes that would make fields unreachable
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() || field.name.split('.').any(str::is_empty) {
                return Err(SchemaError::InvalidFieldName(field.name.clone()));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }
}

/// Per-field coercion table; fields without an entry are cast as strings
#[derive(Debug, Clone, Default)]
pub struct CastTable {
    casts: HashMap<String, CastKind>,
}

impl CastTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cast(mut self, field: impl Into<String>, kind: CastKind) -> Self {
        self.casts.insert(field.into(), kind);
        self
    }

    pub fn get(&self, field: &str) -> CastKind {
        self.casts.get(field).copied().unwrap_or_default()
    }

    /// Casts declared for fields the schema does not know about
    pub fn unknown_fields<'a>(&'a self, schema: &'a FieldSchema) -> impl Iterator<Item = &'a str> {
        self.casts
            .keys()
            .map(String::as_str)
            .filter(move |field| !schema.contains(field))
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error("Invalid field name '{0}'")]
    InvalidFieldName(String),

    #[error("Cast declared for unknown field '{0}'")]
    UnknownCastField(String),
}
