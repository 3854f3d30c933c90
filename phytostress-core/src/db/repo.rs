//! Database repository layer
//!
//! Named-field operations for experiments, treatments and measurements.
//! Writes go through [`Store::execute`] and return its [`Outcome`]; reads map
//! rows to records by column name and return [`Result`].

use super::store::{Outcome, Store};
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use std::str::FromStr;

/// Calendar window for listing measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFilter {
    #[default]
    All,
    Today,
    /// Monday of the reference week through Sunday
    ThisWeek,
    ThisMonth,
    LastMonth,
}

impl DateFilter {
    /// Half-open `[start, end)` date range relative to `today`, or None for `All`.
    pub fn range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            DateFilter::All => None,
            DateFilter::Today => Some((today, today + Duration::days(1))),
            DateFilter::ThisWeek => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Some((start, start + Duration::days(7)))
            }
            DateFilter::ThisMonth => {
                let start = first_of_month(today.year(), today.month())?;
                Some((start, next_month(start)?))
            }
            DateFilter::LastMonth => {
                let this_month = first_of_month(today.year(), today.month())?;
                let start = if today.month() == 1 {
                    first_of_month(today.year() - 1, 12)?
                } else {
                    first_of_month(today.year(), today.month() - 1)?
                };
                Some((start, this_month))
            }
        }
    }
}

impl FromStr for DateFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "all" => Ok(DateFilter::All),
            "today" => Ok(DateFilter::Today),
            "thisweek" => Ok(DateFilter::ThisWeek),
            "thismonth" => Ok(DateFilter::ThisMonth),
            "lastmonth" => Ok(DateFilter::LastMonth),
            _ => Err(format!("unknown date filter: {}", s)),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn next_month(first: NaiveDate) -> Option<NaiveDate> {
    if first.month() == 12 {
        first_of_month(first.year() + 1, 1)
    } else {
        first_of_month(first.year(), first.month() + 1)
    }
}

// ============================================
// Parameter helpers
// ============================================

fn text(s: &str) -> Value {
    Value::Text(s.trim().to_string())
}

/// Blank strings are stored as NULL
fn opt_text(s: Option<&str>) -> Value {
    match s.map(str::trim) {
        Some(s) if !s.is_empty() => Value::Text(s.to_string()),
        _ => Value::Null,
    }
}

fn opt_real(v: Option<f64>) -> Value {
    v.map(Value::Real).unwrap_or(Value::Null)
}

fn opt_int(v: Option<i64>) -> Value {
    v.map(Value::Integer).unwrap_or(Value::Null)
}

/// Substring pattern for `LIKE ... ESCAPE '\'`; wildcards in `term` match literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::from("%");
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn readings_params(r: &Readings) -> [Value; 9] {
    [
        opt_real(r.plant_height),
        opt_real(r.leaf_area),
        opt_real(r.chlorophyll_content),
        opt_real(r.photosynthesis_rate),
        opt_real(r.stomatal_conductance),
        opt_real(r.root_length),
        opt_real(r.biomass_fresh),
        opt_real(r.biomass_dry),
        opt_real(r.water_content),
    ]
}

const NO_READINGS: &str = "at least one measurement value is required";

impl Store {
    // ============================================
    // Experiment operations
    // ============================================

    /// Insert a new experiment
    pub fn add_experiment(&self, experiment: &NewExperiment) -> Outcome {
        self.execute(
            r#"
            INSERT INTO experiments
                (experiment_code, experiment_name, plant_species, stress_type,
                 researcher, start_date, end_date, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            &[
                text(&experiment.code),
                text(&experiment.name),
                text(&experiment.species),
                text(&experiment.stress_type),
                opt_text(experiment.researcher.as_deref()),
                opt_text(experiment.start_date.as_deref()),
                opt_text(experiment.end_date.as_deref()),
                opt_text(experiment.description.as_deref()),
            ],
        )
    }

    /// Update an experiment in place, refreshing `updated_at`
    pub fn update_experiment(&self, id: i64, experiment: &NewExperiment) -> Outcome {
        self.execute(
            r#"
            UPDATE experiments
            SET experiment_code = ?, experiment_name = ?, plant_species = ?,
                stress_type = ?, researcher = ?, start_date = ?, end_date = ?,
                description = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            &[
                text(&experiment.code),
                text(&experiment.name),
                text(&experiment.species),
                text(&experiment.stress_type),
                opt_text(experiment.researcher.as_deref()),
                opt_text(experiment.start_date.as_deref()),
                opt_text(experiment.end_date.as_deref()),
                opt_text(experiment.description.as_deref()),
                Value::Integer(id),
            ],
        )
    }

    /// Change the lifecycle status of an experiment
    pub fn set_experiment_status(&self, id: i64, status: &str) -> Outcome {
        self.execute(
            "UPDATE experiments SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            &[text(status), Value::Integer(id)],
        )
    }

    /// Delete an experiment together with its treatments and their measurements.
    ///
    /// Children are removed with explicit statements before the parent, so the
    /// cascade holds even where the engine's `ON DELETE CASCADE` is off.
    pub fn delete_experiment(&self, id: i64) -> Outcome {
        let id = Value::Integer(id);

        let measurements = self.execute(
            "DELETE FROM measurements WHERE treatment_id IN (SELECT id FROM treatments WHERE experiment_id = ?)",
            std::slice::from_ref(&id),
        );
        if !measurements.is_success() {
            return measurements;
        }

        let treatments = self.execute(
            "DELETE FROM treatments WHERE experiment_id = ?",
            std::slice::from_ref(&id),
        );
        if !treatments.is_success() {
            return treatments;
        }

        self.execute("DELETE FROM experiments WHERE id = ?", &[id])
    }

    /// Get an experiment by ID
    pub fn get_experiment(&self, id: i64) -> Result<Option<Experiment>> {
        self.connection()
            .query_row(
                "SELECT * FROM experiments WHERE id = ?",
                [id],
                Self::row_to_experiment,
            )
            .optional()
            .map_err(Error::from)
    }

    /// Get an experiment by its unique code
    pub fn get_experiment_by_code(&self, code: &str) -> Result<Option<Experiment>> {
        self.connection()
            .query_row(
                "SELECT * FROM experiments WHERE experiment_code = ?",
                [code.trim()],
                Self::row_to_experiment,
            )
            .optional()
            .map_err(Error::from)
    }

    /// List all experiments, newest first
    pub fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT * FROM experiments ORDER BY created_at DESC, id DESC")?;
        let experiments = stmt
            .query_map([], Self::row_to_experiment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(experiments)
    }

    /// Substring search over code, name, species, researcher and stress type.
    ///
    /// A blank term lists everything.
    pub fn search_experiments(&self, term: &str) -> Result<Vec<Experiment>> {
        if term.trim().is_empty() {
            return self.list_experiments();
        }

        let pattern = like_pattern(term);
        let mut stmt = self.connection().prepare(
            r#"
            SELECT * FROM experiments
            WHERE experiment_code LIKE ?1 ESCAPE '\' OR experiment_name LIKE ?1 ESCAPE '\'
               OR plant_species LIKE ?1 ESCAPE '\' OR researcher LIKE ?1 ESCAPE '\'
               OR stress_type LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let experiments = stmt
            .query_map([pattern], Self::row_to_experiment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(experiments)
    }

    /// Number of treatments and measurements that hang off an experiment
    pub fn count_experiment_children(&self, id: i64) -> Result<(i64, i64)> {
        let counts = self.connection().query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM treatments WHERE experiment_id = ?1),
                (SELECT COUNT(*) FROM measurements m
                 JOIN treatments t ON m.treatment_id = t.id
                 WHERE t.experiment_id = ?1)
            "#,
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    pub(crate) fn row_to_experiment(row: &Row) -> rusqlite::Result<Experiment> {
        Ok(Experiment {
            id: row.get("id")?,
            code: row.get("experiment_code")?,
            name: row.get("experiment_name")?,
            species: row.get("plant_species")?,
            stress_type: row.get("stress_type")?,
            researcher: row.get("researcher")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            description: row.get("description")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    // ============================================
    // Treatment operations
    // ============================================

    /// Insert a new treatment; a repeated name within the experiment yields
    /// [`Outcome::Duplicate`]
    pub fn add_treatment(&self, treatment: &NewTreatment) -> Outcome {
        self.execute(
            r#"
            INSERT INTO treatments
                (experiment_id, treatment_name, treatment_type, stress_level,
                 concentration, duration_days, temperature, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            &[
                Value::Integer(treatment.experiment_id),
                text(&treatment.name),
                text(treatment.treatment_type.as_str()),
                text(treatment.effective_stress_level().as_str()),
                opt_real(treatment.concentration),
                opt_int(treatment.duration_days),
                opt_real(treatment.temperature),
                opt_text(treatment.description.as_deref()),
            ],
        )
    }

    /// Update a treatment in place. The owning experiment is not changed.
    pub fn update_treatment(&self, id: i64, treatment: &NewTreatment) -> Outcome {
        self.execute(
            r#"
            UPDATE treatments
            SET treatment_name = ?, treatment_type = ?, stress_level = ?,
                concentration = ?, duration_days = ?, temperature = ?,
                description = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            &[
                text(&treatment.name),
                text(treatment.treatment_type.as_str()),
                text(treatment.effective_stress_level().as_str()),
                opt_real(treatment.concentration),
                opt_int(treatment.duration_days),
                opt_real(treatment.temperature),
                opt_text(treatment.description.as_deref()),
                Value::Integer(id),
            ],
        )
    }

    /// Delete a treatment and its measurements
    pub fn delete_treatment(&self, id: i64) -> Outcome {
        let id = Value::Integer(id);

        let measurements = self.execute(
            "DELETE FROM measurements WHERE treatment_id = ?",
            std::slice::from_ref(&id),
        );
        if !measurements.is_success() {
            return measurements;
        }

        self.execute("DELETE FROM treatments WHERE id = ?", &[id])
    }

    /// Get a treatment by ID
    pub fn get_treatment(&self, id: i64) -> Result<Option<Treatment>> {
        self.connection()
            .query_row(
                "SELECT * FROM treatments WHERE id = ?",
                [id],
                Self::row_to_treatment,
            )
            .optional()
            .map_err(Error::from)
    }

    /// List the treatments of an experiment by name
    pub fn list_treatments(&self, experiment_id: i64) -> Result<Vec<Treatment>> {
        let mut stmt = self.connection().prepare(
            "SELECT * FROM treatments WHERE experiment_id = ? ORDER BY treatment_name",
        )?;
        let treatments = stmt
            .query_map([experiment_id], Self::row_to_treatment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(treatments)
    }

    /// Substring search on treatment name within an experiment
    pub fn search_treatments(&self, experiment_id: i64, term: &str) -> Result<Vec<Treatment>> {
        if term.trim().is_empty() {
            return self.list_treatments(experiment_id);
        }

        let mut stmt = self.connection().prepare(
            r#"
            SELECT * FROM treatments
            WHERE experiment_id = ? AND treatment_name LIKE ? ESCAPE '\'
            ORDER BY treatment_name
            "#,
        )?;
        let treatments = stmt
            .query_map(
                params![experiment_id, like_pattern(term)],
                Self::row_to_treatment,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(treatments)
    }

    pub(crate) fn row_to_treatment(row: &Row) -> rusqlite::Result<Treatment> {
        let treatment_type: String = row.get("treatment_type")?;
        let stress_level: Option<String> = row.get("stress_level")?;

        Ok(Treatment {
            id: row.get("id")?,
            experiment_id: row.get("experiment_id")?,
            name: row.get("treatment_name")?,
            treatment_type: TreatmentType::from_stored(&treatment_type),
            stress_level: stress_level.as_deref().map(StressLevel::from_stored),
            concentration: row.get("concentration")?,
            duration_days: row.get("duration_days")?,
            temperature: row.get("temperature")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    // ============================================
    // Measurement operations
    // ============================================

    /// Insert a measurement. Inputs without any reading are rejected before
    /// reaching the database.
    pub fn add_measurement(&self, measurement: &NewMeasurement) -> Outcome {
        if !measurement.readings.has_any() {
            return Outcome::Failure(NO_READINGS.to_string());
        }

        let mut params = vec![
            Value::Integer(measurement.treatment_id),
            text(&measurement.date),
        ];
        params.extend(readings_params(&measurement.readings));
        params.push(opt_text(measurement.notes.as_deref()));

        self.execute(
            r#"
            INSERT INTO measurements
                (treatment_id, measurement_date, plant_height, leaf_area,
                 chlorophyll_content, photosynthesis_rate, stomatal_conductance,
                 root_length, biomass_fresh, biomass_dry, water_content, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            &params,
        )
    }

    /// Update a measurement in place. The owning treatment is not changed.
    pub fn update_measurement(&self, id: i64, measurement: &NewMeasurement) -> Outcome {
        if !measurement.readings.has_any() {
            return Outcome::Failure(NO_READINGS.to_string());
        }

        let mut params = vec![text(&measurement.date)];
        params.extend(readings_params(&measurement.readings));
        params.push(opt_text(measurement.notes.as_deref()));
        params.push(Value::Integer(id));

        self.execute(
            r#"
            UPDATE measurements
            SET measurement_date = ?, plant_height = ?, leaf_area = ?,
                chlorophyll_content = ?, photosynthesis_rate = ?,
                stomatal_conductance = ?, root_length = ?, biomass_fresh = ?,
                biomass_dry = ?, water_content = ?, notes = ?
            WHERE id = ?
            "#,
            &params,
        )
    }

    /// Delete a single measurement
    pub fn delete_measurement(&self, id: i64) -> Outcome {
        self.execute(
            "DELETE FROM measurements WHERE id = ?",
            &[Value::Integer(id)],
        )
    }

    /// Get a measurement by ID
    pub fn get_measurement(&self, id: i64) -> Result<Option<Measurement>> {
        self.connection()
            .query_row(
                "SELECT * FROM measurements WHERE id = ?",
                [id],
                Self::row_to_measurement,
            )
            .optional()
            .map_err(Error::from)
    }

    /// List the measurements of a treatment, newest date first, restricted to
    /// the window `filter` describes around `today`
    pub fn list_measurements(
        &self,
        treatment_id: i64,
        filter: DateFilter,
        today: NaiveDate,
    ) -> Result<Vec<Measurement>> {
        let conn = self.connection();
        let measurements = match filter.range(today) {
            None => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT * FROM measurements
                    WHERE treatment_id = ?
                    ORDER BY measurement_date DESC, id DESC
                    "#,
                )?;
                let rows = stmt
                    .query_map([treatment_id], Self::row_to_measurement)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            Some((start, end)) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT * FROM measurements
                    WHERE treatment_id = ? AND measurement_date >= ? AND measurement_date < ?
                    ORDER BY measurement_date DESC, id DESC
                    "#,
                )?;
                let rows = stmt
                    .query_map(
                        params![
                            treatment_id,
                            start.format("%Y-%m-%d").to_string(),
                            end.format("%Y-%m-%d").to_string()
                        ],
                        Self::row_to_measurement,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(measurements)
    }

    /// Substring search over measurement date and notes
    pub fn search_measurements(&self, treatment_id: i64, term: &str) -> Result<Vec<Measurement>> {
        let pattern = like_pattern(term);
        let mut stmt = self.connection().prepare(
            r#"
            SELECT * FROM measurements
            WHERE treatment_id = ?1 AND (measurement_date LIKE ?2 ESCAPE '\' OR notes LIKE ?2 ESCAPE '\')
            ORDER BY measurement_date DESC, id DESC
            "#,
        )?;
        let measurements = stmt
            .query_map(params![treatment_id, pattern], Self::row_to_measurement)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(measurements)
    }

    pub(crate) fn row_to_measurement(row: &Row) -> rusqlite::Result<Measurement> {
        Ok(Measurement {
            id: row.get("id")?,
            treatment_id: row.get("treatment_id")?,
            date: row.get("measurement_date")?,
            readings: Readings {
                plant_height: row.get("plant_height")?,
                leaf_area: row.get("leaf_area")?,
                chlorophyll_content: row.get("chlorophyll_content")?,
                photosynthesis_rate: row.get("photosynthesis_rate")?,
                stomatal_conductance: row.get("stomatal_conductance")?,
                root_length: row.get("root_length")?,
                biomass_fresh: row.get("biomass_fresh")?,
                biomass_dry: row.get("biomass_dry")?,
                water_content: row.get("water_content")?,
            },
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }

    // ============================================
    // Restore operations (import)
    // ============================================

    /// Insert an experiment record verbatim apart from its id
    pub fn restore_experiment(&self, experiment: &Experiment) -> Outcome {
        self.execute(
            r#"
            INSERT INTO experiments
                (experiment_code, experiment_name, plant_species, stress_type,
                 researcher, start_date, end_date, description, status,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?,
                    COALESCE(?, 'active'),
                    COALESCE(?, CURRENT_TIMESTAMP),
                    COALESCE(?, CURRENT_TIMESTAMP))
            "#,
            &[
                Value::Text(experiment.code.clone()),
                Value::Text(experiment.name.clone()),
                Value::Text(experiment.species.clone()),
                Value::Text(experiment.stress_type.clone()),
                verbatim(&experiment.researcher),
                verbatim(&experiment.start_date),
                verbatim(&experiment.end_date),
                verbatim(&experiment.description),
                verbatim(&experiment.status),
                verbatim(&experiment.created_at),
                verbatim(&experiment.updated_at),
            ],
        )
    }

    /// Insert a treatment record under `experiment_id`
    pub fn restore_treatment(&self, treatment: &Treatment, experiment_id: i64) -> Outcome {
        self.execute(
            r#"
            INSERT INTO treatments
                (experiment_id, treatment_name, treatment_type, stress_level,
                 concentration, duration_days, temperature, description,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?,
                    COALESCE(?, CURRENT_TIMESTAMP),
                    COALESCE(?, CURRENT_TIMESTAMP))
            "#,
            &[
                Value::Integer(experiment_id),
                Value::Text(treatment.name.clone()),
                Value::Text(treatment.treatment_type.as_str().to_string()),
                treatment
                    .stress_level
                    .as_ref()
                    .map(|l| Value::Text(l.as_str().to_string()))
                    .unwrap_or(Value::Null),
                opt_real(treatment.concentration),
                opt_int(treatment.duration_days),
                opt_real(treatment.temperature),
                verbatim(&treatment.description),
                verbatim(&treatment.created_at),
                verbatim(&treatment.updated_at),
            ],
        )
    }

    /// Insert a measurement record under `treatment_id`
    pub fn restore_measurement(&self, measurement: &Measurement, treatment_id: i64) -> Outcome {
        let mut params = vec![
            Value::Integer(treatment_id),
            Value::Text(measurement.date.clone()),
        ];
        params.extend(readings_params(&measurement.readings));
        params.push(verbatim(&measurement.notes));
        params.push(verbatim(&measurement.created_at));

        self.execute(
            r#"
            INSERT INTO measurements
                (treatment_id, measurement_date, plant_height, leaf_area,
                 chlorophyll_content, photosynthesis_rate, stomatal_conductance,
                 root_length, biomass_fresh, biomass_dry, water_content, notes,
                 created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                    COALESCE(?, CURRENT_TIMESTAMP))
            "#,
            &params,
        )
    }
}

/// Optional text kept exactly as given, blanks included
fn verbatim(s: &Option<String>) -> Value {
    s.clone().map(Value::Text).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn create_test_experiment(store: &Store, code: &str) -> i64 {
        let mut experiment = NewExperiment::new(code, "Drought tolerance", "Zea mays", "drought");
        experiment.researcher = Some("J. Okafor".to_string());
        experiment.start_date = Some("2024-01-01".to_string());
        store.add_experiment(&experiment).inserted_id().unwrap()
    }

    fn create_test_treatment(store: &Store, experiment_id: i64, name: &str) -> i64 {
        let treatment = NewTreatment::new(experiment_id, name, TreatmentType::Drought)
            .with_stress_level(StressLevel::High);
        store.add_treatment(&treatment).inserted_id().unwrap()
    }

    fn create_test_measurement(store: &Store, treatment_id: i64, date: &str, height: f64) -> i64 {
        let readings = Readings {
            plant_height: Some(height),
            ..Default::default()
        };
        store
            .add_measurement(&NewMeasurement::new(treatment_id, date, readings))
            .inserted_id()
            .unwrap()
    }

    #[test]
    fn test_experiment_crud() {
        let store = store();
        let id = create_test_experiment(&store, "EXP001");

        let experiment = store.get_experiment(id).unwrap().unwrap();
        assert_eq!(experiment.code, "EXP001");
        assert_eq!(experiment.species, "Zea mays");
        assert_eq!(experiment.status.as_deref(), Some(DEFAULT_EXPERIMENT_STATUS));
        assert_eq!(experiment.end_date, None);
        assert!(experiment.created_at.is_some());

        let mut update = NewExperiment::new("EXP001", "Renamed", "Zea mays", "drought");
        update.end_date = Some("2024-03-01".to_string());
        assert_eq!(store.update_experiment(id, &update).changes(), 1);

        let experiment = store.get_experiment_by_code("EXP001").unwrap().unwrap();
        assert_eq!(experiment.name, "Renamed");
        assert_eq!(experiment.end_date.as_deref(), Some("2024-03-01"));
        // Researcher was not carried over by the update
        assert_eq!(experiment.researcher, None);

        assert_eq!(store.set_experiment_status(id, "completed").changes(), 1);
        let experiment = store.get_experiment(id).unwrap().unwrap();
        assert_eq!(experiment.status.as_deref(), Some("completed"));
    }

    #[test]
    fn test_blank_optional_fields_are_null() {
        let store = store();
        let mut experiment = NewExperiment::new("EXP002", "Salt", "Oryza sativa", "salt");
        experiment.description = Some("   ".to_string());
        let id = store.add_experiment(&experiment).inserted_id().unwrap();

        let stored = store.get_experiment(id).unwrap().unwrap();
        assert_eq!(stored.description, None);
    }

    #[test]
    fn test_search_experiments() {
        let store = store();
        create_test_experiment(&store, "EXP001");
        let mut other = NewExperiment::new("HEAT-7", "Heat wave", "Triticum aestivum", "heat");
        other.researcher = Some("M. Lindqvist".to_string());
        store.add_experiment(&other);

        assert_eq!(store.search_experiments("triticum").unwrap().len(), 1);
        assert_eq!(store.search_experiments("Lindqvist").unwrap()[0].code, "HEAT-7");
        assert_eq!(store.search_experiments("").unwrap().len(), 2);
        assert!(store.search_experiments("nothing-like-this").unwrap().is_empty());
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let store = store();
        create_test_experiment(&store, "EXP001");
        create_test_experiment(&store, "SALT_50");

        let found = store.search_experiments("T_5").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "SALT_50");
        assert!(store.search_experiments("EXP_0").unwrap().is_empty());
        assert!(store.search_experiments("%").unwrap().is_empty());
    }

    #[test]
    fn test_list_experiments_newest_first() {
        let store = store();
        create_test_experiment(&store, "EXP001");
        create_test_experiment(&store, "EXP002");

        let codes: Vec<_> = store
            .list_experiments()
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();
        assert_eq!(codes, vec!["EXP002", "EXP001"]);
    }

    #[test]
    fn test_treatment_defaults_and_listing() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");

        let control = NewTreatment::new(experiment_id, "Control", TreatmentType::Control);
        let id = store.add_treatment(&control).inserted_id().unwrap();
        create_test_treatment(&store, experiment_id, "Drought-High");

        let stored = store.get_treatment(id).unwrap().unwrap();
        assert_eq!(stored.stress_level, Some(StressLevel::Medium));
        assert_eq!(stored.treatment_type, TreatmentType::Control);

        let names: Vec<_> = store
            .list_treatments(experiment_id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Control", "Drought-High"]);

        let found = store.search_treatments(experiment_id, "drought").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stress_level, Some(StressLevel::High));
    }

    #[test]
    fn test_duplicate_treatment_name() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let first = create_test_treatment(&store, experiment_id, "Drought-High");

        let again = NewTreatment::new(experiment_id, "Drought-High", TreatmentType::Salt);
        assert_eq!(store.add_treatment(&again), Outcome::Duplicate);

        let treatments = store.list_treatments(experiment_id).unwrap();
        assert_eq!(treatments.len(), 1);
        assert_eq!(treatments[0].id, first);
        assert_eq!(treatments[0].treatment_type, TreatmentType::Drought);

        // Same name is fine in another experiment
        let other_experiment = create_test_experiment(&store, "EXP002");
        let elsewhere = NewTreatment::new(other_experiment, "Drought-High", TreatmentType::Drought);
        assert!(store.add_treatment(&elsewhere).inserted_id().is_some());
    }

    #[test]
    fn test_legacy_treatment_text_reads_back() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        store
            .connection()
            .execute(
                "INSERT INTO treatments (experiment_id, treatment_name, treatment_type, stress_level) \
                 VALUES (?, 'Odd', 'nutrient', 'extreme')",
                [experiment_id],
            )
            .unwrap();

        let treatments = store.list_treatments(experiment_id).unwrap();
        assert_eq!(treatments.len(), 1);
        assert_eq!(
            treatments[0].treatment_type,
            TreatmentType::Other("nutrient".to_string())
        );
        assert_eq!(
            treatments[0].stress_level,
            Some(StressLevel::Other("extreme".to_string()))
        );

        // Restoring writes the same text back
        let other = create_test_experiment(&store, "EXP002");
        let id = store
            .restore_treatment(&treatments[0], other)
            .inserted_id()
            .unwrap();
        let (kind, level): (String, String) = store
            .connection()
            .query_row(
                "SELECT treatment_type, stress_level FROM treatments WHERE id = ?",
                [id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "nutrient");
        assert_eq!(level, "extreme");
    }

    #[test]
    fn test_measurement_requires_a_reading() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let treatment_id = create_test_treatment(&store, experiment_id, "Drought-High");

        let empty = NewMeasurement::new(treatment_id, "2024-01-01", Readings::default());
        assert!(matches!(store.add_measurement(&empty), Outcome::Failure(_)));
        assert!(store
            .list_measurements(treatment_id, DateFilter::All, NaiveDate::MIN)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_measurement_crud_and_search() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let treatment_id = create_test_treatment(&store, experiment_id, "Drought-High");

        let first = create_test_measurement(&store, treatment_id, "2024-01-01", 10.0);
        create_test_measurement(&store, treatment_id, "2024-01-15", 15.0);
        // Same date twice is allowed
        create_test_measurement(&store, treatment_id, "2024-01-15", 15.5);

        let mut update = NewMeasurement::new(
            treatment_id,
            "2024-01-01",
            Readings {
                plant_height: Some(10.5),
                biomass_fresh: Some(5.0),
                biomass_dry: Some(1.0),
                ..Default::default()
            },
        )
        .with_derived_water_content();
        update.notes = Some("wilting observed".to_string());
        assert_eq!(store.update_measurement(first, &update).changes(), 1);

        let stored = store.get_measurement(first).unwrap().unwrap();
        assert_eq!(stored.readings.plant_height, Some(10.5));
        assert_eq!(stored.readings.water_content, Some(80.0));

        let all = store
            .list_measurements(treatment_id, DateFilter::All, NaiveDate::MIN)
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, "2024-01-15");
        assert_eq!(all[2].date, "2024-01-01");

        assert_eq!(store.search_measurements(treatment_id, "wilting").unwrap().len(), 1);
        assert_eq!(store.search_measurements(treatment_id, "2024-01-15").unwrap().len(), 2);

        assert_eq!(store.delete_measurement(first).changes(), 1);
        assert!(store.get_measurement(first).unwrap().is_none());
    }

    #[test]
    fn test_list_measurements_by_window() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let treatment_id = create_test_treatment(&store, experiment_id, "Drought-High");
        for date in ["2024-01-31", "2024-02-05", "2024-02-12", "2024-02-14"] {
            create_test_measurement(&store, treatment_id, date, 1.0);
        }

        // Wednesday 2024-02-14
        let today = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let count = |filter| {
            store
                .list_measurements(treatment_id, filter, today)
                .unwrap()
                .len()
        };

        assert_eq!(count(DateFilter::All), 4);
        assert_eq!(count(DateFilter::Today), 1);
        assert_eq!(count(DateFilter::ThisWeek), 2);
        assert_eq!(count(DateFilter::ThisMonth), 3);
        assert_eq!(count(DateFilter::LastMonth), 1);
    }

    #[test]
    fn test_date_filter_ranges() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let (start, end) = DateFilter::LastMonth.range(jan).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let dec = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (_, end) = DateFilter::ThisMonth.range(dec).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

        assert_eq!("this-week".parse::<DateFilter>().unwrap(), DateFilter::ThisWeek);
        assert_eq!("Last Month".parse::<DateFilter>().unwrap(), DateFilter::LastMonth);
        assert!(DateFilter::All.range(dec).is_none());
    }

    #[test]
    fn test_delete_experiment_cascades() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let keep_id = create_test_experiment(&store, "EXP002");
        let t1 = create_test_treatment(&store, experiment_id, "Control");
        let t2 = create_test_treatment(&store, experiment_id, "Drought-High");
        let kept_treatment = create_test_treatment(&store, keep_id, "Control");
        create_test_measurement(&store, t1, "2024-01-01", 9.0);
        create_test_measurement(&store, t2, "2024-01-01", 10.0);
        create_test_measurement(&store, kept_treatment, "2024-01-01", 11.0);

        assert_eq!(store.count_experiment_children(experiment_id).unwrap(), (2, 2));

        let outcome = store.delete_experiment(experiment_id);
        assert_eq!(outcome.changes(), 1);

        assert!(store.get_experiment(experiment_id).unwrap().is_none());
        assert!(store.get_treatment(t1).unwrap().is_none());
        assert_eq!(store.count_experiment_children(experiment_id).unwrap(), (0, 0));
        assert_eq!(store.count_experiment_children(keep_id).unwrap(), (1, 1));

        // Deleting again is harmless
        let again = store.delete_experiment(experiment_id);
        assert!(again.is_success());
        assert_eq!(again.changes(), 0);
    }

    #[test]
    fn test_delete_cascades_without_engine_support() {
        let store = store();
        store
            .connection()
            .execute_batch("PRAGMA foreign_keys = OFF;")
            .unwrap();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let treatment_id = create_test_treatment(&store, experiment_id, "Drought-High");
        create_test_measurement(&store, treatment_id, "2024-01-01", 10.0);

        store.delete_experiment(experiment_id);

        let orphans: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM measurements", [], |r| r.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_delete_treatment_cascades() {
        let store = store();
        let experiment_id = create_test_experiment(&store, "EXP001");
        let treatment_id = create_test_treatment(&store, experiment_id, "Drought-High");
        create_test_measurement(&store, treatment_id, "2024-01-01", 10.0);
        create_test_measurement(&store, treatment_id, "2024-01-02", 11.0);

        assert_eq!(store.delete_treatment(treatment_id).changes(), 1);
        assert_eq!(store.count_experiment_children(experiment_id).unwrap(), (0, 0));
        assert!(store.get_experiment(experiment_id).unwrap().is_some());
    }
}
