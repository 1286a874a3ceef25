//! # leadx
//!
//! Prospect import and declarative filtering for marketing campaigns.
//!
//! leadx pulls prospects from external directory APIs, reconciles them into
//! a soft-deleting record store and exposes them through a generic,
//! schema-driven filter entry point.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! LEADX_ERP_URL=https://dummyjson.com/users leadx import --source erp
//! leadx serve --http-port 8080
//! curl 'http://localhost:8080/api/filter/prospects?gender=female&min_age=30'
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use leadx::prelude::*;
//! use serde_json::json;
//!
//! let prospects = Collection::new("prospects");
//! prospects
//!     .create(json!({"gender": "female", "age": 34, "source": "erp", "address": {"city": "Bern"}}))
//!     .unwrap();
//!
//! let raw = json!({"address_city": "Bern", "min_age": "30", "min_source": "erp"});
//! let clauses = compile(&prospect::schema(), raw.as_object().unwrap(), &prospect::casts());
//! assert_eq!(clauses.len(), 2);
//! assert_eq!(prospects.count(&clauses), 1);
//! ```
//!
//! ## Crate Structure
//!
//! - [`leadx-core`](leadx_core) - Field schemas, cast registry, filter compiler, search criteria, record store
//! - [`leadx-storage`](leadx_storage) - Entity registry and snapshot persistence
//! - [`leadx-import`](leadx_import) - Source adapters and import reconciliation
//! - [`leadx-campaign`](leadx_campaign) - Campaign sending rules, visit tracking, analytics
//! - [`leadx-api`](leadx_api) - REST API

// Re-export core types
pub use leadx_core::{
    compile, criteria, CastKind, CastTable, Collection, Condition, Criterion, EnumValue, Error,
    FieldKind, FieldSchema, Filter, FilterClause, Operator, RawFilters, Record, RecordId,
    RecordStore, Result, SearchCriteria, TypedValue,
};

// Re-export storage
pub use leadx_storage::{Entity, StorageManager};

// Re-export import
pub use leadx_import::{
    prospect, DataSource, ImportConfig, ImportReconciler, ImportSummary, ProspectRecord,
    SourceAdapter, SourceConfig,
};

// Re-export campaigns
pub use leadx_campaign::{Campaign, CampaignAnalytics, CampaignStatus, Landingpage, VisitTracker};

// Re-export API
pub use leadx_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        compile, prospect, CastKind, CastTable, Collection, Condition, DataSource, EnumValue,
        FieldSchema, Filter, FilterClause, ImportReconciler, Operator, RawFilters, Record,
        RecordStore, SearchCriteria, SourceAdapter, SourceConfig, StorageManager, TypedValue,
    };
}
