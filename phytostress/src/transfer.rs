//! `export` and `import` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use phytostress_core::export::{self, Document, ExportFormat};
use phytostress_core::{Config, Store};

use crate::records::resolve_experiment;

#[derive(Subcommand)]
pub enum ExportCommand {
    /// Growth, stress impact and statistics tables of one experiment
    Analysis {
        /// Experiment code or id
        experiment: String,

        /// csv, xlsx or txt
        #[arg(short, long, default_value = "xlsx")]
        format: ExportFormat,

        /// Output file; CSV exports use it as a prefix, one file per table
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Every experiment, treatment and measurement
    All {
        /// csv, xlsx, txt or json
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

pub fn run_export(store: &Store, config: &Config, cmd: ExportCommand) -> Result<()> {
    let written = match cmd {
        ExportCommand::Analysis {
            experiment,
            format,
            out,
        } => {
            let experiment = resolve_experiment(store, &experiment)?;
            let default_name = format!("{}_analysis.{}", experiment.code, format.extension());
            let target = config.resolve_export_path(&out.unwrap_or_else(|| default_name.into()));
            export::export_analysis(
                store,
                experiment.id,
                format,
                &target,
                config.export.decimal_places,
            )
            .with_context(|| format!("failed to export analysis of {}", experiment.code))?
        }
        ExportCommand::All { format, out } => {
            let default_name = format!("plant_stress_data.{}", format.extension());
            let target = config.resolve_export_path(&out.unwrap_or_else(|| default_name.into()));
            export::export_all(store, format, &target).context("failed to export data")?
        }
    };

    for path in &written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn run_import(store: &Store, file: &Path) -> Result<()> {
    let document =
        Document::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let summary = document
        .import_into(store)
        .with_context(|| format!("failed to import {}", file.display()))?;

    println!(
        "Imported {} experiment(s), {} treatment(s), {} measurement(s)",
        summary.experiments, summary.treatments, summary.measurements
    );
    Ok(())
}
