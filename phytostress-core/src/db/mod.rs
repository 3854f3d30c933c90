//! Database layer for phytostress
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - A generic statement primitive returning tagged outcomes
//! - Repository operations per entity

pub mod repo;
pub mod schema;
pub mod store;

pub use repo::DateFilter;
pub use store::{Outcome, Row, Store};
