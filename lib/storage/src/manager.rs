use crate::persistence::{EntitySnapshot, SnapshotData, SnapshotPersistence, SNAPSHOT_VERSION};
use chrono::{DateTime, Utc};
use leadx_core::{
    compile, CastTable, Collection, Error, FieldSchema, FilterClause, RawFilters, Record, RecordStore,
    Result, SchemaError, SearchCriteria,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Rows per page for the generic filter entry point
pub const DEFAULT_PER_PAGE: usize = 10;

/// A filterable entity: its declared schema and the records behind it
pub struct Entity {
    name: String,
    schema: FieldSchema,
    casts: CastTable,
    collection: Arc<Collection>,
}

/// One page of filter results
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub records: Vec<Record>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn casts(&self) -> &CastTable {
        &self.casts
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    pub fn compile(&self, raw: &RawFilters) -> Vec<FilterClause> {
        compile(&self.schema, raw, &self.casts)
    }

    /// Every live record matching the raw filters
    pub fn filter(&self, raw: &RawFilters) -> Vec<Record> {
        self.collection.query(&self.compile(raw))
    }

    /// One page of matches; pages start at 1
    pub fn filter_page(&self, raw: &RawFilters, page: usize, per_page: usize) -> Page {
        let page = page.max(1);
        let (records, total) = self.collection.query_page(&self.compile(raw), page, per_page);
        Page {
            records,
            page,
            per_page,
            total,
        }
    }

    pub fn search_criteria(&self) -> SearchCriteria {
        self.collection.search_criteria(&self.schema)
    }
}

/// Entity registry with snapshot persistence
pub struct StorageManager {
    entities: Arc<RwLock<HashMap<String, Arc<Entity>>>>,
    /// Snapshot records of entities that have not been registered yet
    restored: Mutex<HashMap<String, Vec<Record>>>,
    data_dir: PathBuf,
    persistence: Arc<SnapshotPersistence>,
}

impl StorageManager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let persistence = Arc::new(SnapshotPersistence::new(&data_dir));
        let mut restored = HashMap::new();

        if let Some(snapshot) = persistence
            .load()
            .map_err(|e| Error::Persistence(format!("{e:#}")))?
        {
            for entity in snapshot.entities {
                restored.insert(entity.name, entity.records);
            }
            info!(
                path = %persistence.path().display(),
                entities = restored.len(),
                "Snapshot loaded"
            );
        }

        Ok(Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
            restored: Mutex::new(restored),
            data_dir,
            persistence,
        })
    }

    /// Register an entity whose filter values are all cast as strings
    pub fn register(&self, name: &str, schema: FieldSchema) -> Result<Arc<Entity>> {
        self.register_with_casts(name, schema, CastTable::new())
    }

    /// Register an entity; records from a loaded snapshot are put back
    pub fn register_with_casts(
        &self,
        name: &str,
        schema: FieldSchema,
        casts: CastTable,
    ) -> Result<Arc<Entity>> {
        schema.validate()?;
        if let Some(field) = casts.unknown_fields(&schema).next() {
            return Err(SchemaError::UnknownCastField(field.to_string()).into());
        }

        let mut entities = self.entities.write();
        if entities.contains_key(name) {
            return Err(Error::EntityExists(name.to_string()));
        }

        let collection = Arc::new(Collection::new(name));
        if let Some(records) = self.restored.lock().remove(name) {
            let count = records.len();
            for record in records {
                if let Err(e) = collection.insert_existing(record) {
                    warn!(entity = name, error = %e, "Failed to restore record");
                }
            }
            info!(entity = name, records = count, "Restored entity from snapshot");
        }

        let entity = Arc::new(Entity {
            name: name.to_string(),
            schema,
            casts,
            collection,
        });
        entities.insert(name.to_string(), entity.clone());
        Ok(entity)
    }

    /// Resolve an entity by name; `None` means not found or not filterable
    #[inline]
    pub fn entity(&self, name: &str) -> Option<Arc<Entity>> {
        self.entities.read().get(name).cloned()
    }

    #[must_use]
    pub fn list_entities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entities.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[inline]
    #[must_use]
    pub fn entity_exists(&self, name: &str) -> bool {
        self.entities.read().contains_key(name)
    }

    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write every entity, including snapshot data not yet claimed by a registration
    pub fn save(&self) -> Result<()> {
        let mut entities: Vec<EntitySnapshot> = self
            .entities
            .read()
            .values()
            .map(|entity| EntitySnapshot {
                name: entity.name.clone(),
                records: entity.collection.all_with_trashed(),
            })
            .collect();
        entities.extend(self.restored.lock().iter().map(|(name, records)| EntitySnapshot {
            name: name.clone(),
            records: records.clone(),
        }));
        entities.sort_by(|a, b| a.name.cmp(&b.name));

        let snapshot = SnapshotData {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            entities,
        };
        self.persistence
            .save(&snapshot)
            .map_err(|e| Error::Persistence(format!("{e:#}")))?;
        info!(path = %self.persistence.path().display(), "Snapshot saved");
        Ok(())
    }

    pub fn last_save_time(&self) -> Option<DateTime<Utc>> {
        self.persistence.last_save_time()
    }
}
