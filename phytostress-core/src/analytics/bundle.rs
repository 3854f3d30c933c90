//! Flat export bundle of one experiment, and the entity tables shared with
//! the whole-store export.

use serde::{Deserialize, Serialize};

use super::table::{Cell, Table};
use super::Analyzer;
use crate::db::Store;
use crate::types::{Experiment, Measurement, Treatment};

/// A measurement together with the name of its treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    #[serde(flatten)]
    pub measurement: Measurement,
    pub treatment_name: String,
}

/// Everything stored for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportBundle {
    pub experiment: Experiment,
    pub treatments: Vec<Treatment>,
    pub measurements: Vec<MeasurementRecord>,
}

impl ExportBundle {
    /// Experiment header, treatments and measurements as three tables
    pub fn tables(&self) -> Vec<Table> {
        let mut measurements = Table::new("Measurements", &MEASUREMENT_COLUMNS);
        measurements.columns.push("treatment_name".to_string());
        for record in &self.measurements {
            let mut row = measurement_cells(&record.measurement);
            row.push(Cell::from(record.treatment_name.as_str()));
            measurements.push_row(row);
        }

        vec![
            experiments_table("Experiment Details", std::slice::from_ref(&self.experiment)),
            treatments_table("Treatments", &self.treatments),
            measurements,
        ]
    }
}

const EXPERIMENT_COLUMNS: [&str; 12] = [
    "id",
    "experiment_code",
    "experiment_name",
    "plant_species",
    "stress_type",
    "researcher",
    "start_date",
    "end_date",
    "description",
    "status",
    "created_at",
    "updated_at",
];

const TREATMENT_COLUMNS: [&str; 11] = [
    "id",
    "experiment_id",
    "treatment_name",
    "treatment_type",
    "stress_level",
    "concentration",
    "duration_days",
    "temperature",
    "description",
    "created_at",
    "updated_at",
];

const MEASUREMENT_COLUMNS: [&str; 14] = [
    "id",
    "treatment_id",
    "measurement_date",
    "plant_height",
    "leaf_area",
    "chlorophyll_content",
    "photosynthesis_rate",
    "stomatal_conductance",
    "root_length",
    "biomass_fresh",
    "biomass_dry",
    "water_content",
    "notes",
    "created_at",
];

/// Experiments with their stored column names
pub fn experiments_table(title: &str, experiments: &[Experiment]) -> Table {
    let mut table = Table::new(title, &EXPERIMENT_COLUMNS);
    for e in experiments {
        table.push_row(vec![
            e.id.into(),
            Cell::from(e.code.as_str()),
            Cell::from(e.name.as_str()),
            Cell::from(e.species.as_str()),
            Cell::from(e.stress_type.as_str()),
            e.researcher.clone().into(),
            e.start_date.clone().into(),
            e.end_date.clone().into(),
            e.description.clone().into(),
            e.status.clone().into(),
            e.created_at.clone().into(),
            e.updated_at.clone().into(),
        ]);
    }
    table
}

/// Treatments with their stored column names
pub fn treatments_table(title: &str, treatments: &[Treatment]) -> Table {
    let mut table = Table::new(title, &TREATMENT_COLUMNS);
    for t in treatments {
        table.push_row(vec![
            t.id.into(),
            t.experiment_id.into(),
            Cell::from(t.name.as_str()),
            Cell::from(t.treatment_type.as_str()),
            t.stress_level.as_ref().map(|l| l.as_str()).into(),
            t.concentration.into(),
            t.duration_days.into(),
            t.temperature.into(),
            t.description.clone().into(),
            t.created_at.clone().into(),
            t.updated_at.clone().into(),
        ]);
    }
    table
}

/// Measurements with their stored column names
pub fn measurements_table(title: &str, measurements: &[Measurement]) -> Table {
    let mut table = Table::new(title, &MEASUREMENT_COLUMNS);
    for m in measurements {
        table.push_row(measurement_cells(m));
    }
    table
}

fn measurement_cells(m: &Measurement) -> Vec<Cell> {
    let r = &m.readings;
    vec![
        m.id.into(),
        m.treatment_id.into(),
        Cell::from(m.date.as_str()),
        r.plant_height.into(),
        r.leaf_area.into(),
        r.chlorophyll_content.into(),
        r.photosynthesis_rate.into(),
        r.stomatal_conductance.into(),
        r.root_length.into(),
        r.biomass_fresh.into(),
        r.biomass_dry.into(),
        r.water_content.into(),
        m.notes.clone().into(),
        m.created_at.clone().into(),
    ]
}

impl Analyzer<'_> {
    /// The experiment, its treatments and its measurements joined with
    /// their treatment name. None when the experiment does not exist.
    pub fn export_bundle(&self, experiment_id: i64) -> Option<ExportBundle> {
        self.guarded("export_bundle", experiment_id, || {
            let store = self.store();
            let Some(experiment) = store.get_experiment(experiment_id)? else {
                return Ok(None);
            };

            let mut stmt = store
                .connection()
                .prepare("SELECT * FROM treatments WHERE experiment_id = ? ORDER BY id")?;
            let treatments = stmt
                .query_map([experiment_id], Store::row_to_treatment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stmt = store.connection().prepare(
                r#"
                SELECT m.*, t.treatment_name
                FROM measurements m
                JOIN treatments t ON m.treatment_id = t.id
                WHERE t.experiment_id = ?
                ORDER BY m.id
                "#,
            )?;
            let measurements = stmt
                .query_map([experiment_id], |row| {
                    Ok(MeasurementRecord {
                        measurement: Store::row_to_measurement(row)?,
                        treatment_name: row.get("treatment_name")?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(ExportBundle {
                experiment,
                treatments,
                measurements,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::exp001;

    #[test]
    fn test_export_bundle() {
        let fx = exp001();
        let bundle = Analyzer::new(&fx.store)
            .export_bundle(fx.experiment_id)
            .unwrap();

        assert_eq!(bundle.experiment.code, "EXP001");
        assert_eq!(bundle.treatments.len(), 2);
        assert_eq!(bundle.measurements.len(), 2);
        assert!(bundle
            .measurements
            .iter()
            .all(|m| m.treatment_name == "Drought-High"));

        let tables = bundle.tables();
        let titles: Vec<_> = tables.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Experiment Details", "Treatments", "Measurements"]);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[2].columns.last().unwrap(), "treatment_name");
        assert_eq!(tables[2].rows[0].len(), 15);
        assert_eq!(
            tables[0].column("experiment_code").unwrap(),
            vec![&Cell::from("EXP001")]
        );
    }

    #[test]
    fn test_export_bundle_missing_experiment() {
        let fx = exp001();
        assert!(Analyzer::new(&fx.store).export_bundle(42).is_none());
    }

    #[test]
    fn test_measurement_record_json_is_flat() {
        let fx = exp001();
        let bundle = Analyzer::new(&fx.store)
            .export_bundle(fx.experiment_id)
            .unwrap();
        let value = serde_json::to_value(&bundle.measurements[0]).unwrap();
        assert_eq!(value["treatment_name"], "Drought-High");
        assert_eq!(value["date"], "2024-01-01");
        assert_eq!(value["plant_height"], 10.0);
    }
}
