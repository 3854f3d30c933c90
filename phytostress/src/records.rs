//! Experiment, treatment and measurement subcommands.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use phytostress_core::analytics::Analyzer;
use phytostress_core::format::{format_measurement_summary, format_reading, format_text};
use phytostress_core::{
    DateFilter, Experiment, Measurement, NewExperiment, NewMeasurement, NewTreatment, Readings,
    StressLevel, Store, Treatment, TreatmentType,
};

use crate::{expect_changed, expect_inserted};

// ============================================
// Experiments
// ============================================

#[derive(Subcommand)]
pub enum ExperimentCommand {
    /// Create an experiment
    Add(NewExperimentArgs),

    /// Change fields of an experiment; omitted fields keep their value
    Update {
        /// Experiment code or id
        experiment: String,

        #[command(flatten)]
        fields: ExperimentFields,
    },

    /// List experiments, newest first
    List,

    /// Find experiments by code, name, species, researcher or stress type
    Search { term: String },

    /// Show an experiment with its treatments
    Show {
        /// Experiment code or id
        experiment: String,
    },

    /// Delete an experiment with all its treatments and measurements
    Delete {
        /// Experiment code or id
        experiment: String,
    },

    /// Set the status of an experiment (e.g. active, completed)
    Status {
        /// Experiment code or id
        experiment: String,
        status: String,
    },
}

#[derive(Args)]
pub struct NewExperimentArgs {
    /// Unique experiment code, e.g. EXP001
    #[arg(long)]
    code: String,
    #[arg(long)]
    name: String,
    /// Plant species
    #[arg(long)]
    species: String,
    /// Stress category of the study
    #[arg(long)]
    stress_type: String,
    #[arg(long)]
    researcher: Option<String>,
    #[arg(long)]
    start_date: Option<NaiveDate>,
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
pub struct ExperimentFields {
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    species: Option<String>,
    #[arg(long)]
    stress_type: Option<String>,
    #[arg(long)]
    researcher: Option<String>,
    #[arg(long)]
    start_date: Option<NaiveDate>,
    #[arg(long)]
    end_date: Option<NaiveDate>,
    #[arg(long)]
    description: Option<String>,
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Look an experiment up by code, falling back to a numeric id
pub(crate) fn resolve_experiment(store: &Store, key: &str) -> Result<Experiment> {
    if let Some(experiment) = store.get_experiment_by_code(key)? {
        return Ok(experiment);
    }
    if let Ok(id) = key.parse::<i64>() {
        if let Some(experiment) = store.get_experiment(id)? {
            return Ok(experiment);
        }
    }
    bail!("no experiment with code or id '{}'", key)
}

fn resolve_treatment(store: &Store, id: i64) -> Result<Treatment> {
    store
        .get_treatment(id)?
        .with_context(|| format!("no treatment with id {}", id))
}

pub fn run_experiment(store: &Store, cmd: ExperimentCommand) -> Result<()> {
    match cmd {
        ExperimentCommand::Add(args) => {
            let experiment = NewExperiment {
                code: args.code,
                name: args.name,
                species: args.species,
                stress_type: args.stress_type,
                researcher: args.researcher,
                start_date: date_text(args.start_date),
                end_date: date_text(args.end_date),
                description: args.description,
            };
            let what = format!("experiment {}", experiment.code);
            let id = expect_inserted(store.add_experiment(&experiment), &what)?;
            println!("Created experiment {} (id {})", experiment.code, id);
        }
        ExperimentCommand::Update { experiment, fields } => {
            let current = resolve_experiment(store, &experiment)?;
            let update = NewExperiment {
                code: fields.code.unwrap_or(current.code),
                name: fields.name.unwrap_or(current.name),
                species: fields.species.unwrap_or(current.species),
                stress_type: fields.stress_type.unwrap_or(current.stress_type),
                researcher: fields.researcher.or(current.researcher),
                start_date: date_text(fields.start_date).or(current.start_date),
                end_date: date_text(fields.end_date).or(current.end_date),
                description: fields.description.or(current.description),
            };
            let what = format!("experiment {}", update.code);
            expect_changed(store.update_experiment(current.id, &update), &what)?;
            println!("Updated experiment {}", update.code);
        }
        ExperimentCommand::List => {
            print_experiments(&store.list_experiments()?);
        }
        ExperimentCommand::Search { term } => {
            print_experiments(&store.search_experiments(&term)?);
        }
        ExperimentCommand::Show { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            show_experiment(store, &experiment)?;
        }
        ExperimentCommand::Delete { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            let (treatments, measurements) = store.count_experiment_children(experiment.id)?;
            let what = format!("experiment {}", experiment.code);
            expect_changed(store.delete_experiment(experiment.id), &what)?;
            println!(
                "Deleted experiment {} with {} treatment(s) and {} measurement(s)",
                experiment.code, treatments, measurements
            );
        }
        ExperimentCommand::Status { experiment, status } => {
            let experiment = resolve_experiment(store, &experiment)?;
            let what = format!("experiment {}", experiment.code);
            expect_changed(store.set_experiment_status(experiment.id, &status), &what)?;
            println!("Experiment {} is now {}", experiment.code, status.trim());
        }
    }
    Ok(())
}

fn print_experiments(experiments: &[Experiment]) {
    if experiments.is_empty() {
        println!("No experiments found.");
        return;
    }
    for e in experiments {
        println!(
            "{:>4}  {:<12} {} ({}, {}) [{}]",
            e.id,
            e.code,
            e.name,
            e.species,
            e.stress_type,
            format_text(e.status.as_deref())
        );
    }
}

fn show_experiment(store: &Store, e: &Experiment) -> Result<()> {
    println!("Experiment: {} - {}", e.code, e.name);
    println!("  Species:     {}", e.species);
    println!("  Stress type: {}", e.stress_type);
    println!("  Researcher:  {}", format_text(e.researcher.as_deref()));
    println!(
        "  Period:      {} to {}",
        format_text(e.start_date.as_deref()),
        format_text(e.end_date.as_deref())
    );
    println!("  Status:      {}", format_text(e.status.as_deref()));
    println!("  Description: {}", format_text(e.description.as_deref()));

    let treatments = store.list_treatments(e.id)?;
    println!("\nTreatments ({}):", treatments.len());
    let analyzer = Analyzer::new(store);
    for t in &treatments {
        let summary = analyzer
            .measurement_summary(t.id)
            .map(|s| format_measurement_summary(&s))
            .unwrap_or_else(|| "no measurements".to_string());
        println!(
            "  [{}] {} ({}, {}): {}",
            t.id,
            t.name,
            t.treatment_type,
            t.stress_level.as_ref().map(|l| l.as_str()).unwrap_or("-"),
            summary
        );
    }
    Ok(())
}

// ============================================
// Treatments
// ============================================

#[derive(Subcommand)]
pub enum TreatmentCommand {
    /// Add a treatment to an experiment
    Add {
        /// Experiment code or id
        experiment: String,

        #[arg(long)]
        name: String,

        /// One of: control, drought, salt, heat, cold, flooding,
        /// nutrient_deficiency, UV, biotic, combined, heavy_metal
        #[arg(long = "type")]
        treatment_type: TreatmentType,

        #[command(flatten)]
        fields: TreatmentFields,
    },

    /// Change fields of a treatment; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        treatment_type: Option<TreatmentType>,

        #[command(flatten)]
        fields: TreatmentFields,
    },

    /// List the treatments of an experiment
    List {
        /// Experiment code or id
        experiment: String,
    },

    /// Find treatments of an experiment by name
    Search {
        /// Experiment code or id
        experiment: String,
        term: String,
    },

    /// Delete a treatment and its measurements
    Delete { id: i64 },
}

#[derive(Args)]
pub struct TreatmentFields {
    /// low, medium (default), high, severe or control
    #[arg(long)]
    stress_level: Option<StressLevel>,
    #[arg(long)]
    concentration: Option<f64>,
    #[arg(long)]
    duration_days: Option<i64>,
    /// Temperature in °C
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    description: Option<String>,
}

pub fn run_treatment(store: &Store, cmd: TreatmentCommand) -> Result<()> {
    match cmd {
        TreatmentCommand::Add {
            experiment,
            name,
            treatment_type,
            fields,
        } => {
            let experiment = resolve_experiment(store, &experiment)?;
            let treatment = NewTreatment {
                experiment_id: experiment.id,
                name,
                treatment_type,
                stress_level: fields.stress_level,
                concentration: fields.concentration,
                duration_days: fields.duration_days,
                temperature: fields.temperature,
                description: fields.description,
            };
            let what = format!("treatment {} in {}", treatment.name, experiment.code);
            let id = expect_inserted(store.add_treatment(&treatment), &what)?;
            println!("Created treatment {} (id {})", treatment.name, id);
        }
        TreatmentCommand::Update {
            id,
            name,
            treatment_type,
            fields,
        } => {
            let current = resolve_treatment(store, id)?;
            let update = NewTreatment {
                experiment_id: current.experiment_id,
                name: name.unwrap_or(current.name),
                treatment_type: treatment_type.unwrap_or(current.treatment_type),
                stress_level: fields.stress_level.or(current.stress_level),
                concentration: fields.concentration.or(current.concentration),
                duration_days: fields.duration_days.or(current.duration_days),
                temperature: fields.temperature.or(current.temperature),
                description: fields.description.or(current.description),
            };
            let what = format!("treatment {}", update.name);
            expect_changed(store.update_treatment(id, &update), &what)?;
            println!("Updated treatment {}", update.name);
        }
        TreatmentCommand::List { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            print_treatments(&store.list_treatments(experiment.id)?);
        }
        TreatmentCommand::Search { experiment, term } => {
            let experiment = resolve_experiment(store, &experiment)?;
            print_treatments(&store.search_treatments(experiment.id, &term)?);
        }
        TreatmentCommand::Delete { id } => {
            let treatment = resolve_treatment(store, id)?;
            let what = format!("treatment {}", treatment.name);
            expect_changed(store.delete_treatment(id), &what)?;
            println!("Deleted treatment {}", treatment.name);
        }
    }
    Ok(())
}

fn print_treatments(treatments: &[Treatment]) {
    if treatments.is_empty() {
        println!("No treatments found.");
        return;
    }
    for t in treatments {
        println!(
            "{:>4}  {:<20} {:<20} {:<8} conc={} days={} temp={}",
            t.id,
            t.name,
            t.treatment_type.as_str(),
            t.stress_level.as_ref().map(|l| l.as_str()).unwrap_or("-"),
            format_reading(t.concentration, ""),
            t.duration_days
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format_reading(t.temperature, "°C"),
        );
    }
}

// ============================================
// Measurements
// ============================================

#[derive(Subcommand)]
pub enum MeasurementCommand {
    /// Record a measurement for a treatment
    Add {
        /// Treatment id
        treatment: i64,

        /// Measurement date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        readings: ReadingArgs,

        #[arg(long)]
        notes: Option<String>,

        /// Compute water content from fresh and dry biomass when it is not given
        #[arg(long)]
        derive_water: bool,
    },

    /// Change a measurement; omitted readings keep their value
    Update {
        id: i64,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        readings: ReadingArgs,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        derive_water: bool,
    },

    /// List the measurements of a treatment, newest first
    List {
        /// Treatment id
        treatment: i64,

        /// all, today, this-week, this-month or last-month
        #[arg(long, default_value = "all")]
        period: DateFilter,
    },

    /// Find measurements by date or notes
    Search {
        /// Treatment id
        treatment: i64,
        term: String,
    },

    /// Delete a measurement
    Delete { id: i64 },
}

#[derive(Args)]
pub struct ReadingArgs {
    /// Plant height in cm
    #[arg(long)]
    plant_height: Option<f64>,
    /// Leaf area in cm²
    #[arg(long)]
    leaf_area: Option<f64>,
    #[arg(long)]
    chlorophyll_content: Option<f64>,
    #[arg(long)]
    photosynthesis_rate: Option<f64>,
    #[arg(long)]
    stomatal_conductance: Option<f64>,
    #[arg(long)]
    root_length: Option<f64>,
    /// Fresh biomass in g
    #[arg(long)]
    biomass_fresh: Option<f64>,
    /// Dry biomass in g
    #[arg(long)]
    biomass_dry: Option<f64>,
    /// Water content in %
    #[arg(long)]
    water_content: Option<f64>,
}

impl ReadingArgs {
    /// Given values override `base`
    fn over(self, base: Readings) -> Readings {
        Readings {
            plant_height: self.plant_height.or(base.plant_height),
            leaf_area: self.leaf_area.or(base.leaf_area),
            chlorophyll_content: self.chlorophyll_content.or(base.chlorophyll_content),
            photosynthesis_rate: self.photosynthesis_rate.or(base.photosynthesis_rate),
            stomatal_conductance: self.stomatal_conductance.or(base.stomatal_conductance),
            root_length: self.root_length.or(base.root_length),
            biomass_fresh: self.biomass_fresh.or(base.biomass_fresh),
            biomass_dry: self.biomass_dry.or(base.biomass_dry),
            water_content: self.water_content.or(base.water_content),
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn run_measurement(store: &Store, cmd: MeasurementCommand) -> Result<()> {
    match cmd {
        MeasurementCommand::Add {
            treatment,
            date,
            readings,
            notes,
            derive_water,
        } => {
            let treatment = resolve_treatment(store, treatment)?;
            let date = date.unwrap_or_else(today).format("%Y-%m-%d").to_string();
            let mut measurement =
                NewMeasurement::new(treatment.id, date, readings.over(Readings::default()));
            measurement.notes = notes;
            if derive_water {
                measurement = measurement.with_derived_water_content();
            }
            if !measurement.readings.has_any() {
                bail!("at least one measurement value is required");
            }

            let what = format!("measurement for {}", treatment.name);
            let id = expect_inserted(store.add_measurement(&measurement), &what)?;
            println!(
                "Recorded measurement {} for {} on {} (water content {})",
                id,
                treatment.name,
                measurement.date,
                format_reading(measurement.readings.water_content, "%")
            );
        }
        MeasurementCommand::Update {
            id,
            date,
            readings,
            notes,
            derive_water,
        } => {
            let current = store
                .get_measurement(id)?
                .with_context(|| format!("no measurement with id {}", id))?;
            let mut update = NewMeasurement::new(
                current.treatment_id,
                date.map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or(current.date),
                readings.over(current.readings),
            );
            update.notes = notes.or(current.notes);
            if derive_water {
                update = update.with_recomputed_water_content();
            }

            expect_changed(store.update_measurement(id, &update), &format!("measurement {}", id))?;
            println!("Updated measurement {}", id);
        }
        MeasurementCommand::List { treatment, period } => {
            let treatment = resolve_treatment(store, treatment)?;
            print_measurements(&store.list_measurements(treatment.id, period, today())?);
        }
        MeasurementCommand::Search { treatment, term } => {
            let treatment = resolve_treatment(store, treatment)?;
            print_measurements(&store.search_measurements(treatment.id, &term)?);
        }
        MeasurementCommand::Delete { id } => {
            expect_changed(store.delete_measurement(id), &format!("measurement {}", id))?;
            println!("Deleted measurement {}", id);
        }
    }
    Ok(())
}

fn print_measurements(measurements: &[Measurement]) {
    if measurements.is_empty() {
        println!("No measurements found.");
        return;
    }
    for m in measurements {
        let r = &m.readings;
        println!(
            "{:>4}  {}  height={} leaf={} chl={} water={}  {}",
            m.id,
            m.date,
            format_reading(r.plant_height, "cm"),
            format_reading(r.leaf_area, "cm²"),
            format_reading(r.chlorophyll_content, ""),
            format_reading(r.water_content, "%"),
            format_text(m.notes.as_deref()),
        );
    }
}
