//! # leadx Storage
//!
//! Entity registry ([`StorageManager`]) mapping names to a field schema and
//! an in-memory collection, plus gzip JSON snapshot persistence.

pub mod manager;
pub mod persistence;

pub use manager::{Entity, Page, StorageManager, DEFAULT_PER_PAGE};
pub use persistence::SnapshotPersistence;
