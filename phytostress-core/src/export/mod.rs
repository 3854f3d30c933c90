//! Export writers
//!
//! Writers consume [`Table`]s and [`json::Document`]s only; they know nothing
//! about the store. Two entry points tie them to the data:
//! - [`export_analysis`]: growth, stress impact and statistics tables for
//!   one experiment
//! - [`export_all`]: every stored experiment, treatment and measurement

pub mod csv;
pub mod json;
pub mod report;
pub mod workbook;

pub use json::{Document, ImportSummary};

use std::path::{Path, PathBuf};

use crate::analytics::{Analyzer, Table, ToTable};
use crate::db::Store;
use crate::error::{Error, Result};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One delimited file per table
    Csv,
    /// One workbook, one sheet per table
    Xlsx,
    /// Plain-text report
    Txt,
    /// Nested JSON document (whole-store export only)
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Txt => "txt",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "txt" | "text" => Ok(ExportFormat::Txt),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("unknown export format: {}", s)),
        }
    }
}

/// Analysis tables of one experiment, rounded for display.
///
/// Aggregates with nothing to show are left out.
pub fn analysis_tables(analyzer: &Analyzer<'_>, experiment_id: i64, places: Option<u32>) -> Vec<Table> {
    let mut tables = Vec::new();
    if let Some(growth) = analyzer.growth_summary(experiment_id) {
        tables.push(growth.to_table(places));
    }
    if let Some(impact) = analyzer.stress_impact_summary(experiment_id) {
        tables.push(impact.to_table(places));
    }
    if let Some(stats) = analyzer.statistics_summary(experiment_id) {
        tables.push(stats.to_table(places));
    }
    tables
}

/// Write the analysis tables of one experiment and return the files written.
///
/// Fails with [`Error::ExperimentNotFound`] for an unknown id and with
/// [`Error::NoData`] when the experiment has nothing to analyze.
pub fn export_analysis(
    store: &Store,
    experiment_id: i64,
    format: ExportFormat,
    out: &Path,
    places: Option<u32>,
) -> Result<Vec<PathBuf>> {
    if store.get_experiment(experiment_id)?.is_none() {
        return Err(Error::ExperimentNotFound(experiment_id));
    }
    let tables = analysis_tables(&Analyzer::new(store), experiment_id, places);
    if tables.is_empty() {
        return Err(Error::NoData(format!(
            "no analysis data for experiment {}",
            experiment_id
        )));
    }

    let written = write_tables(format, out, report::ANALYSIS_BANNER, &tables)?;
    tracing::info!(experiment_id, %format, files = written.len(), "Exported analysis");
    Ok(written)
}

/// Write every stored row and return the files written.
///
/// Fails with [`Error::NoData`] when the store is empty.
pub fn export_all(store: &Store, format: ExportFormat, out: &Path) -> Result<Vec<PathBuf>> {
    let document = Document::from_store(store)?;
    if document.is_empty() {
        return Err(Error::NoData("the store is empty".to_string()));
    }

    let written = match format {
        ExportFormat::Json => {
            document.write(out)?;
            vec![out.to_path_buf()]
        }
        _ => write_tables(format, out, report::COMPREHENSIVE_BANNER, &document.tables())?,
    };
    tracing::info!(%format, files = written.len(), "Exported all data");
    Ok(written)
}

fn write_tables(format: ExportFormat, out: &Path, banner: &str, tables: &[Table]) -> Result<Vec<PathBuf>> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match format {
        ExportFormat::Csv => csv::write_tables(out, tables),
        ExportFormat::Xlsx => {
            workbook::write_workbook(out, tables)?;
            Ok(vec![out.to_path_buf()])
        }
        ExportFormat::Txt => {
            report::write_report(out, banner, tables)?;
            Ok(vec![out.to_path_buf()])
        }
        ExportFormat::Json => Err(Error::InvalidInput(
            "JSON is only available for the whole-store export".to_string(),
        )),
    }
}
