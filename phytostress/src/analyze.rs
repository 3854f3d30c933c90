//! `analyze` subcommand - runs one aggregate and prints it.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use phytostress_core::analytics::{Table, ToTable};
use phytostress_core::export::report::render_table;
use phytostress_core::format::{format_growth_rate, format_measurement_summary};
use phytostress_core::{Analyzer, Config, Store};

use crate::records::resolve_experiment;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    #[command(subcommand)]
    analysis: Analysis,
}

#[derive(Subcommand)]
enum Analysis {
    /// Mean and spread of height, leaf area and fresh biomass per treatment
    Growth {
        /// Experiment code or id
        experiment: String,
    },

    /// Compare average readings across treatments
    Impact {
        /// Experiment code or id
        experiment: String,
    },

    /// Per-treatment statistics
    Stats {
        /// Experiment code or id
        experiment: String,
    },

    /// Height and water content over time
    Timeline {
        /// Experiment code or id
        experiment: String,
    },

    /// Height growth per day between the first and last measurement
    Rate {
        /// Treatment id
        treatment: i64,
    },

    /// Measurement count and averages of one treatment
    Summary {
        /// Treatment id
        treatment: i64,
    },
}

pub fn run(store: &Store, config: &Config, args: AnalyzeArgs) -> Result<()> {
    let json = match args.format.as_str() {
        "text" => false,
        "json" => true,
        other => bail!("unknown output format '{}', expected text or json", other),
    };
    let places = config.export.decimal_places;
    let analyzer = Analyzer::new(store);

    match args.analysis {
        Analysis::Growth { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            match analyzer.growth_summary(experiment.id) {
                Some(summary) => print_table(&summary.to_table(places), json)?,
                None => println!("No growth data for {}.", experiment.code),
            }
        }
        Analysis::Impact { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            match analyzer.stress_impact_summary(experiment.id) {
                Some(summary) => print_table(&summary.to_table(places), json)?,
                None => println!("No stress impact data for {}.", experiment.code),
            }
        }
        Analysis::Stats { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            match analyzer.statistics_summary(experiment.id) {
                Some(summary) => print_table(&summary.to_table(places), json)?,
                None => println!("No statistics for {}.", experiment.code),
            }
        }
        Analysis::Timeline { experiment } => {
            let experiment = resolve_experiment(store, &experiment)?;
            match analyzer.timeline_series(experiment.id) {
                // Series keep full precision in JSON
                Some(series) if json => println!("{}", serde_json::to_string_pretty(&series)?),
                Some(series) => print_table(&series.to_table(places), false)?,
                None => println!("No timeline data for {}.", experiment.code),
            }
        }
        Analysis::Rate { treatment } => match analyzer.growth_rate(treatment) {
            Some(rate) if json => {
                let output = serde_json::json!({
                    "treatment_id": treatment,
                    "rate_per_day": rate.rate_per_day,
                    "period_days": rate.period_days,
                    "initial_height": rate.initial_height,
                    "final_height": rate.final_height,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Some(rate) => println!("{}", format_growth_rate(&rate)),
            None => println!("Not enough height data for treatment {}.", treatment),
        },
        Analysis::Summary { treatment } => match analyzer.measurement_summary(treatment) {
            Some(summary) if json => {
                let output = serde_json::json!({
                    "treatment_id": treatment,
                    "count": summary.count,
                    "avg_height": summary.avg_height,
                    "avg_leaf_area": summary.avg_leaf_area,
                    "avg_water_content": summary.avg_water_content,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Some(summary) => println!("{}", format_measurement_summary(&summary)),
            None => println!("No measurements for treatment {}.", treatment),
        },
    }

    Ok(())
}

fn print_table(table: &Table, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
    } else {
        let mut out = format!("{}\n\n", table.title);
        render_table(&mut out, table);
        print!("{}", out);
    }
    Ok(())
}
