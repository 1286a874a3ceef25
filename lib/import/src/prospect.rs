//! The prospect entity: normalized record, data sources and filter schema

use chrono::{DateTime, Utc};
use leadx_core::{CastKind, CastTable, EnumValue, FieldSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registry name of the prospect entity
pub const ENTITY: &str = "prospects";

/// External system a prospect was imported from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Erp,
    Kueba,
}

impl DataSource {
    /// Fixed order in which sources are imported
    pub const ALL: [DataSource; 2] = [DataSource::Erp, DataSource::Kueba];

    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Erp => "ERP",
            DataSource::Kueba => "Küba",
        }
    }
}

impl EnumValue for DataSource {
    const NAME: &'static str = "DataSource";

    fn from_value(value: &str) -> Option<Self> {
        match value {
            "erp" => Some(DataSource::Erp),
            "kueba" => Some(DataSource::Kueba),
            _ => None,
        }
    }

    fn as_value(&self) -> &'static str {
        match self {
            DataSource::Erp => "erp",
            DataSource::Kueba => "kueba",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_value())
    }
}

impl std::str::FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataSource::from_value(s).ok_or_else(|| format!("unknown data source '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A prospect normalized from any source.
///
/// `email` identifies the person across imports; `external_id` together
/// with `source` tells whether the record was part of the latest fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProspectRecord {
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub gender: String,
    pub age: i64,
    pub birth_date: DateTime<Utc>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_type: Option<String>,
    pub address: Address,
    pub source: DataSource,
}

impl ProspectRecord {
    /// Storage document for this prospect
    pub fn to_payload(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Filterable prospect fields
pub fn schema() -> FieldSchema {
    FieldSchema::new()
        .enumeration("source")
        .enumeration("gender")
        .enumeration("blood_group")
        .enumeration("eye_color")
        .enumeration("hair_color")
        .enumeration("hair_type")
        .enumeration("address.city")
        .enumeration("address.state")
        .enumeration("address.country")
        .range("age")
        .range("height")
        .range("weight")
        .range("birth_date")
        .plain("first_name")
        .plain("last_name")
        .plain("email")
        .plain("external_id")
}

/// Coercion of raw filter values for prospect fields
pub fn casts() -> CastTable {
    CastTable::new()
        .cast("age", CastKind::Integer)
        .cast("height", CastKind::Float)
        .cast("weight", CastKind::Float)
        .cast("birth_date", CastKind::Date)
        .cast("source", CastKind::enumeration::<DataSource>())
}
