//! # leadx Core
//!
//! Core library for leadx.
//!
//! This crate provides the declarative filtering kernel:
//!
//! - [`FieldSchema`] - Filterable fields and their kinds (enum, range, plain)
//! - [`CastTable`] / [`CastKind`] - Per-field coercion of raw filter values
//! - [`compile`] - Key-based filters (`min_age`, `gender_in`, ...) to typed clauses
//! - [`criteria::build`] - Distinct values and min/max bounds for filter UIs
//! - [`Collection`] - In-memory [`RecordStore`] with soft deletion
//!
//! ## Example
//!
//! ```rust
//! use leadx_core::{compile, CastKind, CastTable, Collection, FieldSchema, RecordStore};
//! use serde_json::json;
//!
//! let schema = FieldSchema::new().enumeration("address.city").range("age");
//! let casts = CastTable::new().cast("age", CastKind::Integer);
//!
//! let collection = Collection::new("prospects");
//! collection.create(json!({"age": 31, "address": {"city": "Lucerne"}})).unwrap();
//!
//! let raw = json!({"address_city": "Lucerne", "min_age": "30"});
//! let clauses = compile(&schema, raw.as_object().unwrap(), &casts);
//! assert_eq!(collection.query(&clauses).len(), 1);
//! ```

pub mod collection;
pub mod criteria;
pub mod error;
pub mod filter;
pub mod record;
pub mod schema;
pub mod store;
pub mod value;

pub use collection::Collection;
pub use criteria::{Criterion, SearchCriteria};
pub use error::{Error, Result};
pub use filter::{compile, Condition, Filter, FilterClause, Operator, RawFilters};
pub use record::{Record, RecordId};
pub use schema::{CastTable, FieldDef, FieldKind, FieldSchema, SchemaError};
pub use store::RecordStore;
pub use value::{CastError, CastKind, EnumValue, TypedValue};
