//! # leadx Import
//!
//! Pulls prospects from external directory APIs and reconciles them into a
//! [`RecordStore`](leadx_core::RecordStore):
//!
//! - [`SourceAdapter`] - lazy prospect stream over one endpoint (paged or single-shot)
//! - [`mapping`] - declarative per-source field mapping tables
//! - [`ImportReconciler`] - upsert by email, resurrection, stale-record pruning
//! - [`HttpFetch`] - outbound HTTP capability, [`ReqwestFetcher`] in production

pub mod config;
pub mod error;
pub mod fetch;
pub mod mapping;
pub mod prospect;
pub mod reconcile;
pub mod source;

pub use config::ImportConfig;
pub use error::{Error, Result};
pub use fetch::{FetchResponse, HttpFetch, ReqwestFetcher};
pub use mapping::{MappingError, MappingRule};
pub use prospect::{Address, DataSource, ProspectRecord};
pub use reconcile::{ImportReconciler, ImportSummary};
pub use source::{Pagination, ProspectStream, SourceAdapter, SourceConfig};
