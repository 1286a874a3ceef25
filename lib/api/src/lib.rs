//! # leadx API
//!
//! Thin REST surface: `GET /api/filter/{entity}` runs the generic filter
//! entry point, `GET /api/filter/{entity}/search-criteria` returns the
//! criteria for building a filter UI.

pub mod query;
pub mod rest;

pub use query::parse_filters;
pub use rest::RestApi;
