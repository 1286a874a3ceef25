use crate::criteria::{self, SearchCriteria};
use crate::filter::Filter;
use crate::record::{Record, RecordId};
use crate::schema::FieldSchema;
use crate::store::RecordStore;
use crate::{Error, Result};
use ahash::AHashMap;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Records are never physically removed, so positions in `records` stay valid
#[derive(Default)]
struct Inner {
    records: Vec<Record>,
    index: AHashMap<RecordId, usize>,
}

/// In-memory document store with soft deletion
pub struct Collection {
    name: String,
    inner: Arc<RwLock<Inner>>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live records
    pub fn count_live(&self) -> usize {
        self.inner.read().records.iter().filter(|r| !r.is_trashed()).count()
    }

    /// Number of records including soft-deleted ones
    pub fn len_with_trashed(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Get a record by ID, soft-deleted or not
    pub fn get(&self, id: RecordId) -> Option<Record> {
        let inner = self.inner.read();
        inner.index.get(&id).map(|&pos| inner.records[pos].clone())
    }

    /// Put back a previously persisted record as-is
    pub fn insert_existing(&self, record: Record) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&record.id) {
            return Err(Error::Storage(format!("duplicate record id {}", record.id)));
        }
        let pos = inner.records.len();
        inner.index.insert(record.id, pos);
        inner.records.push(record);
        Ok(())
    }

    /// Every record, soft-deleted ones included
    pub fn all_with_trashed(&self) -> Vec<Record> {
        self.inner.read().records.clone()
    }

    /// One page of live matches plus the total match count
    pub fn query_page(&self, filter: &dyn Filter, page: usize, per_page: usize) -> (Vec<Record>, usize) {
        let matches = self.query(filter);
        let total = matches.len();
        let start = page.saturating_sub(1).saturating_mul(per_page);
        let records = matches.into_iter().skip(start).take(per_page).collect();
        (records, total)
    }

    /// Criteria over a single projection of the schema's top-level roots
    pub fn search_criteria(&self, schema: &FieldSchema) -> SearchCriteria {
        let projection = self.project(&schema.roots());
        criteria::build(schema, &projection)
    }

    fn with_record<T>(&self, id: RecordId, f: impl FnOnce(&mut Record) -> T) -> Result<T> {
        let mut inner = self.inner.write();
        let pos = *inner
            .index
            .get(&id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        Ok(f(&mut inner.records[pos]))
    }
}

fn ensure_object(payload: &Value) -> Result<()> {
    if payload.is_object() {
        Ok(())
    } else {
        Err(Error::InvalidPayload("payload must be a JSON object".to_string()))
    }
}

impl RecordStore for Collection {
    fn create(&self, payload: Value) -> Result<Record> {
        ensure_object(&payload)?;
        let record = Record::new(payload);
        self.insert_existing(record.clone())?;
        Ok(record)
    }

    fn find_one_with_trashed(&self, filter: &dyn Filter) -> Option<Record> {
        self.inner.read().records.iter().find(|r| filter.matches(r)).cloned()
    }

    fn update(&self, id: RecordId, payload: Value) -> Result<Record> {
        ensure_object(&payload)?;
        self.with_record(id, |record| {
            record.payload = payload;
            record.updated_at = Utc::now();
            record.clone()
        })
    }

    fn restore(&self, id: RecordId) -> Result<bool> {
        self.with_record(id, |record| {
            let was_trashed = record.deleted_at.take().is_some();
            if was_trashed {
                record.updated_at = Utc::now();
            }
            was_trashed
        })
    }

    fn delete_where(&self, filter: &dyn Filter) -> Result<usize> {
        let now = Utc::now();
        let mut inner = self.inner.write();
        let mut deleted = 0;
        for record in inner.records.iter_mut() {
            if !record.is_trashed() && filter.matches(record) {
                record.deleted_at = Some(now);
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn query(&self, filter: &dyn Filter) -> Vec<Record> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| !r.is_trashed() && filter.matches(r))
            .cloned()
            .collect()
    }

    fn count(&self, filter: &dyn Filter) -> usize {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| !r.is_trashed() && filter.matches(r))
            .count()
    }

    fn project(&self, roots: &[&str]) -> Vec<Value> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| !r.is_trashed())
            .map(|r| {
                let projected = roots
                    .iter()
                    .filter_map(|root| r.payload.get(*root).map(|v| (root.to_string(), v.clone())))
                    .collect();
                Value::Object(projected)
            })
            .collect()
    }

    fn index_by(&self, field: &str) -> AHashMap<String, RecordId> {
        let inner = self.inner.read();
        let mut index = AHashMap::with_capacity(inner.records.len());
        for record in &inner.records {
            if let Some(Value::String(key)) = record.get(field) {
                index.entry(key.clone()).or_insert(record.id);
            }
        }
        index
    }
}
