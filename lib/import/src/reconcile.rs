//! Import reconciliation: upsert by email, resurrect, prune stale records

use crate::prospect::{DataSource, ProspectRecord};
use crate::source::SourceAdapter;
use crate::Result;
use ahash::{AHashMap, AHashSet};
use leadx_core::{EnumValue, Filter, Record, RecordId, RecordStore};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

/// Outcome of one source run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub source: Option<DataSource>,
    /// Records successfully parsed from the source
    pub fetched: usize,
    pub created: usize,
    /// Existing live records refreshed in place
    pub updated: usize,
    /// Soft-deleted records refreshed and brought back
    pub restored: usize,
    pub pruned: usize,
}

/// Synchronizes one source into a record store.
///
/// The prune step only runs after the whole stream has been drained and
/// persisted; a fatal fetch error leaves existing records untouched apart
/// from upserts already applied in the same run.
pub struct ImportReconciler<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> ImportReconciler<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    pub async fn run(&self, adapter: &SourceAdapter) -> Result<ImportSummary> {
        let source = adapter.source();
        info!(source = %source, "Starting import from {}", source.label());

        match self.reconcile(adapter).await {
            Ok(summary) => {
                info!(
                    source = %source,
                    fetched = summary.fetched,
                    created = summary.created,
                    updated = summary.updated,
                    restored = summary.restored,
                    pruned = summary.pruned,
                    "Import finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(source = %source, error = %e, "Import from {} failed", source.label());
                Err(e)
            }
        }
    }

    async fn reconcile(&self, adapter: &SourceAdapter) -> Result<ImportSummary> {
        let source = adapter.source();
        let mut summary = ImportSummary {
            source: Some(source),
            ..Default::default()
        };

        let mut stream = adapter.fetch()?;
        let mut by_email = self.store.index_by("email");
        let mut fetched_ids: AHashSet<String> = AHashSet::new();
        while let Some(prospect) = stream.next().await? {
            self.upsert(&prospect, &mut by_email, &mut summary)?;
            fetched_ids.insert(prospect.external_id);
            summary.fetched += 1;
        }

        if summary.fetched == 0 {
            info!(source = %source, "Source returned no records, skipping prune");
            return Ok(summary);
        }

        let stale = StaleRecords {
            source: source.as_value(),
            fetched_ids,
        };
        summary.pruned = self.store.delete_where(&stale)?;
        Ok(summary)
    }

    fn upsert(
        &self,
        prospect: &ProspectRecord,
        by_email: &mut AHashMap<String, RecordId>,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let payload = prospect.to_payload()?;

        match by_email.get(prospect.email.as_str()) {
            Some(&id) => {
                self.store.update(id, payload)?;
                if self.store.restore(id)? {
                    summary.restored += 1;
                } else {
                    summary.updated += 1;
                }
            }
            None => {
                let record = self.store.create(payload)?;
                by_email.insert(prospect.email.clone(), record.id);
                summary.created += 1;
            }
        }
        Ok(())
    }
}

/// Records of one source carrying an external id that was not fetched
struct StaleRecords {
    source: &'static str,
    fetched_ids: AHashSet<String>,
}

impl Filter for StaleRecords {
    fn matches(&self, record: &Record) -> bool {
        if record.get("source").and_then(Value::as_str) != Some(self.source) {
            return false;
        }
        match record.get("external_id") {
            None | Some(Value::Null) => false,
            Some(Value::String(id)) => !self.fetched_ids.contains(id.as_str()),
            Some(other) => !self.fetched_ids.contains(&other.to_string()),
        }
    }
}
