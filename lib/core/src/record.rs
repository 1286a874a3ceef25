use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use crate::value::get_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    #[must_use]
    pub fn new() -> Self {
        RecordId(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(u: Uuid) -> Self {
        RecordId(u)
    }
}

impl std::str::FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(RecordId)
    }
}

/// A stored document with lifecycle timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    /// Document body; always a JSON object
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Record {
    #[must_use]
    pub fn new(payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            payload,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[inline]
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Read a dotted path from the payload
    #[inline]
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.payload, path)
    }

    /// Payload flattened together with the record id, as exposed to clients
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("id".to_string(), Value::String(self.id.to_string()));
        if let Value::Object(fields) = &self.payload {
            for (key, value) in fields {
                if key != "id" {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        object.insert("created_at".to_string(), Value::String(self.created_at.to_rfc3339()));
        object.insert("updated_at".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(object)
    }
}
