//! phytostress - plant stress physiology experiment recorder
//!
//! Command line front end: records experiments, treatments and measurements,
//! runs the aggregate analyses and writes exports.

mod analyze;
mod records;
mod transfer;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use phytostress_core::{Config, Outcome, Store};

use crate::analyze::AnalyzeArgs;
use crate::records::{ExperimentCommand, MeasurementCommand, TreatmentCommand};
use crate::transfer::ExportCommand;

#[derive(Parser)]
#[command(name = "phytostress")]
#[command(about = "Record and analyze plant stress physiology experiments")]
#[command(version)]
struct Cli {
    /// Database file to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage experiments
    #[command(subcommand)]
    Experiment(ExperimentCommand),

    /// Manage the treatments of an experiment
    #[command(subcommand)]
    Treatment(TreatmentCommand),

    /// Record and browse measurements of a treatment
    #[command(subcommand)]
    Measurement(MeasurementCommand),

    /// Run an analysis
    Analyze(AnalyzeArgs),

    /// Export analysis results or the whole database
    #[command(subcommand)]
    Export(ExportCommand),

    /// Import a JSON document written by `export all --format json`
    Import {
        /// Document to read
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = phytostress_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    // Open database
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    tracing::debug!(path = %db_path.display(), "Using database");

    let store = Store::open(&db_path).context("failed to open database")?;
    store
        .initialize()
        .context("failed to initialize database schema")?;

    match cli.command {
        Command::Experiment(cmd) => records::run_experiment(&store, cmd),
        Command::Treatment(cmd) => records::run_treatment(&store, cmd),
        Command::Measurement(cmd) => records::run_measurement(&store, cmd),
        Command::Analyze(args) => analyze::run(&store, &config, args),
        Command::Export(cmd) => transfer::run_export(&store, &config, cmd),
        Command::Import { file } => transfer::run_import(&store, &file),
    }
}

/// Id of a row created by an insert, or an error naming what went wrong
pub(crate) fn expect_inserted(outcome: Outcome, what: &str) -> Result<i64> {
    match outcome {
        Outcome::Duplicate => bail!("{} already exists", what),
        Outcome::Failure(reason) => bail!("failed to save {}: {}", what, reason),
        other => other
            .inserted_id()
            .with_context(|| format!("{} was not saved", what)),
    }
}

/// Succeeds when an update or delete touched at least one row
pub(crate) fn expect_changed(outcome: Outcome, what: &str) -> Result<()> {
    match outcome {
        Outcome::Duplicate => bail!("{} already exists", what),
        Outcome::Failure(reason) => bail!("failed to update {}: {}", what, reason),
        other if other.changes() == 0 => bail!("{} not found", what),
        _ => Ok(()),
    }
}
