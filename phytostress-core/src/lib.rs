//! # phytostress-core
//!
//! Core library for phytostress - a record keeper for plant stress
//! physiology experiments.
//!
//! This library provides:
//! - Domain types for experiments, treatments and measurements
//! - Database storage layer with SQLite
//! - Aggregate analysis over one experiment
//! - CSV, workbook, text report and JSON export, plus JSON import
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! A [`Store`] owns the single database connection. Writes go through
//! [`Store::execute`], which reports every statement as a tagged [`Outcome`].
//! An [`Analyzer`] borrows the store for read-only aggregates and returns
//! `None` when there is nothing to show. Aggregates become display
//! [`Table`](analytics::Table)s, which the [`export`] writers serialize.
//!
//! ## Example
//!
//! ```rust,no_run
//! use phytostress_core::{Analyzer, Config, NewExperiment, Store};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let store = Store::open(&config.resolved_database_path()).expect("failed to open database");
//! store.initialize().expect("failed to run migrations");
//!
//! let id = store
//!     .add_experiment(&NewExperiment::new("EXP001", "Drought", "Zea mays", "drought"))
//!     .inserted_id();
//! if let Some(stats) = id.and_then(|id| Analyzer::new(&store).statistics_summary(id)) {
//!     println!("{} treatments", stats.rows.len());
//! }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::Analyzer;
pub use config::Config;
pub use db::{DateFilter, Outcome, Store};
pub use error::{Error, Result};
pub use export::{Document, ExportFormat};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod format;
pub mod logging;
pub mod types;
