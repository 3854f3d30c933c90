//! Nested JSON document of experiments, treatments and measurements, and
//! importing such a document into a store.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analytics::bundle::{experiments_table, measurements_table, treatments_table};
use crate::analytics::{ExportBundle, Table};
use crate::db::{Outcome, Store};
use crate::error::{Error, Result};
use crate::types::{Experiment, Measurement, Treatment};

/// The three entity lists, keyed by their export names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub experiments: Vec<Experiment>,
    #[serde(default)]
    pub treatments: Vec<Treatment>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// Rows inserted by [`Document::import_into`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub experiments: usize,
    pub treatments: usize,
    pub measurements: usize,
}

impl Document {
    /// Every row in the store, in id order
    pub fn from_store(store: &Store) -> Result<Self> {
        let conn = store.connection();

        let experiments = conn
            .prepare("SELECT * FROM experiments ORDER BY id")?
            .query_map([], Store::row_to_experiment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let treatments = conn
            .prepare("SELECT * FROM treatments ORDER BY id")?
            .query_map([], Store::row_to_treatment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let measurements = conn
            .prepare("SELECT * FROM measurements ORDER BY id")?
            .query_map([], Store::row_to_measurement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            experiments,
            treatments,
            measurements,
        })
    }

    /// The document for a single experiment
    pub fn from_bundle(bundle: &ExportBundle) -> Self {
        Self {
            experiments: vec![bundle.experiment.clone()],
            treatments: bundle.treatments.clone(),
            measurements: bundle
                .measurements
                .iter()
                .map(|record| record.measurement.clone())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.treatments.is_empty() && self.measurements.is_empty()
    }

    /// One table per non-empty entity list
    pub fn tables(&self) -> Vec<Table> {
        let mut tables = Vec::new();
        if !self.experiments.is_empty() {
            tables.push(experiments_table("Experiments", &self.experiments));
        }
        if !self.treatments.is_empty() {
            tables.push(treatments_table("Treatments", &self.treatments));
        }
        if !self.measurements.is_empty() {
            tables.push(measurements_table("Measurements", &self.measurements));
        }
        tables
    }

    /// Write as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "Wrote JSON document");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Insert every row into `store` under fresh ids.
    ///
    /// Foreign keys are remapped to the new ids; every other field, the
    /// timestamps included, is kept. The import is all or nothing: the rows
    /// are written in one transaction, and an experiment code already in the
    /// store, a code repeated in the document, a dangling reference or any
    /// rejected row leaves the store untouched.
    pub fn import_into(&self, store: &Store) -> Result<ImportSummary> {
        self.check_references()?;
        for experiment in &self.experiments {
            if store.get_experiment_by_code(&experiment.code)?.is_some() {
                return Err(Error::Import(format!(
                    "experiment code {} already exists",
                    experiment.code
                )));
            }
        }

        // Dropping the transaction without committing rolls every insert back
        let tx = store.connection().unchecked_transaction()?;

        let mut experiment_ids = HashMap::new();
        for experiment in &self.experiments {
            let id = inserted(
                store.restore_experiment(experiment),
                || format!("experiment {}", experiment.code),
            )?;
            experiment_ids.insert(experiment.id, id);
        }

        let mut treatment_ids = HashMap::new();
        for treatment in &self.treatments {
            let experiment_id = remapped(&experiment_ids, treatment.experiment_id)?;
            let id = inserted(
                store.restore_treatment(treatment, experiment_id),
                || format!("treatment {}", treatment.name),
            )?;
            treatment_ids.insert(treatment.id, id);
        }

        for measurement in &self.measurements {
            let treatment_id = remapped(&treatment_ids, measurement.treatment_id)?;
            inserted(
                store.restore_measurement(measurement, treatment_id),
                || format!("measurement {} of {}", measurement.id, measurement.date),
            )?;
        }

        tx.commit()?;

        let summary = ImportSummary {
            experiments: experiment_ids.len(),
            treatments: treatment_ids.len(),
            measurements: self.measurements.len(),
        };
        tracing::info!(?summary, "Imported document");
        Ok(summary)
    }

    fn check_references(&self) -> Result<()> {
        let experiments: HashSet<i64> = self.experiments.iter().map(|e| e.id).collect();
        let treatments: HashSet<i64> = self.treatments.iter().map(|t| t.id).collect();

        if experiments.len() != self.experiments.len() || treatments.len() != self.treatments.len() {
            return Err(Error::Import("document contains repeated ids".to_string()));
        }
        let mut codes = HashSet::new();
        if let Some(e) = self.experiments.iter().find(|e| !codes.insert(e.code.as_str())) {
            return Err(Error::Import(format!(
                "experiment code {} appears more than once",
                e.code
            )));
        }
        if let Some(t) = self
            .treatments
            .iter()
            .find(|t| !experiments.contains(&t.experiment_id))
        {
            return Err(Error::Import(format!(
                "treatment {} references unknown experiment {}",
                t.name, t.experiment_id
            )));
        }
        if let Some(m) = self
            .measurements
            .iter()
            .find(|m| !treatments.contains(&m.treatment_id))
        {
            return Err(Error::Import(format!(
                "measurement {} references unknown treatment {}",
                m.id, m.treatment_id
            )));
        }
        Ok(())
    }
}

fn remapped(ids: &HashMap<i64, i64>, old: i64) -> Result<i64> {
    ids.get(&old)
        .copied()
        .ok_or_else(|| Error::Import(format!("no imported row for id {}", old)))
}

fn inserted(outcome: Outcome, what: impl FnOnce() -> String) -> Result<i64> {
    match outcome {
        Outcome::Applied { .. } => outcome
            .inserted_id()
            .ok_or_else(|| Error::Import(format!("{} was not inserted", what()))),
        Outcome::Duplicate => Err(Error::Import(format!("{} already exists", what()))),
        Outcome::Failure(reason) => Err(Error::Import(format!("{}: {}", what(), reason))),
        Outcome::Rows(_) | Outcome::Empty => {
            Err(Error::Import(format!("{} was not inserted", what())))
        }
    }
}
