use crate::filter::Filter;
use crate::record::{Record, RecordId};
use crate::Result;
use ahash::AHashMap;
use serde_json::Value;

/// Record storage capability used by import and query code.
///
/// Queries never return soft-deleted records; only
/// [`find_one_with_trashed`](RecordStore::find_one_with_trashed) sees them.
pub trait RecordStore: Send + Sync {
    /// Insert a new record; the payload must be a JSON object
    fn create(&self, payload: Value) -> Result<Record>;

    /// First record matching the filter, soft-deleted ones included
    fn find_one_with_trashed(&self, filter: &dyn Filter) -> Option<Record>;

    /// Replace a record's payload
    fn update(&self, id: RecordId, payload: Value) -> Result<Record>;

    /// Clear the deletion marker; returns whether the record was trashed
    fn restore(&self, id: RecordId) -> Result<bool>;

    /// Soft-delete every live record matching the filter
    fn delete_where(&self, filter: &dyn Filter) -> Result<usize>;

    /// Live records matching the filter, in insertion order
    fn query(&self, filter: &dyn Filter) -> Vec<Record>;

    fn count(&self, filter: &dyn Filter) -> usize;

    /// Live records reduced to the given top-level keys
    fn project(&self, roots: &[&str]) -> Vec<Value>;

    /// Text values of `field` mapped to the first record carrying them,
    /// soft-deleted records included
    fn index_by(&self, field: &str) -> AHashMap<String, RecordId>;
}
