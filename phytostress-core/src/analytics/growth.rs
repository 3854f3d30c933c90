//! Growth summary: spread of the size readings per treatment.

use std::collections::BTreeMap;

use super::table::{Cell, Table, ToTable};
use super::{mean, sample_std_dev, Analyzer};

/// Mean and sample standard deviation of one reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spread {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl Spread {
    /// Spread over the non-null values
    pub fn of(values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        Self {
            mean: mean(&present),
            std_dev: sample_std_dev(&present),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRow {
    pub treatment_name: String,
    pub plant_height: Spread,
    pub leaf_area: Spread,
    pub biomass_fresh: Spread,
}

/// Growth rows, one per measured treatment, ordered by treatment name.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthSummary {
    pub rows: Vec<GrowthRow>,
}

impl GrowthSummary {
    pub fn get(&self, treatment_name: &str) -> Option<&GrowthRow> {
        self.rows.iter().find(|r| r.treatment_name == treatment_name)
    }
}

impl ToTable for GrowthSummary {
    const DEFAULT_PLACES: u32 = 2;

    fn raw_table(&self) -> Table {
        let mut table = Table::new(
            "Growth Rates",
            &[
                "treatment_name",
                "plant_height_mean",
                "plant_height_std",
                "leaf_area_mean",
                "leaf_area_std",
                "biomass_mean",
                "biomass_std",
            ],
        );
        for row in &self.rows {
            table.push_row(vec![
                Cell::from(row.treatment_name.as_str()),
                row.plant_height.mean.into(),
                row.plant_height.std_dev.into(),
                row.leaf_area.mean.into(),
                row.leaf_area.std_dev.into(),
                row.biomass_fresh.mean.into(),
                row.biomass_fresh.std_dev.into(),
            ]);
        }
        table
    }
}

#[derive(Default)]
struct Readings {
    height: Vec<Option<f64>>,
    leaf_area: Vec<Option<f64>>,
    biomass: Vec<Option<f64>>,
}

impl Analyzer<'_> {
    /// Mean and spread of height, leaf area and fresh biomass per treatment.
    ///
    /// Returns None when the experiment has no measurements at all.
    pub fn growth_summary(&self, experiment_id: i64) -> Option<GrowthSummary> {
        self.guarded("growth_summary", experiment_id, || {
            let mut stmt = self.store().connection().prepare(
                r#"
                SELECT t.treatment_name, m.measurement_date, m.plant_height,
                       m.leaf_area, m.biomass_fresh
                FROM measurements m
                JOIN treatments t ON m.treatment_id = t.id
                WHERE t.experiment_id = ?
                ORDER BY t.treatment_name, m.measurement_date
                "#,
            )?;

            let mut groups: BTreeMap<String, Readings> = BTreeMap::new();
            let mut rows = stmt.query([experiment_id])?;
            while let Some(row) = rows.next()? {
                let group = groups
                    .entry(row.get::<_, String>("treatment_name")?)
                    .or_default();
                group.height.push(row.get("plant_height")?);
                group.leaf_area.push(row.get("leaf_area")?);
                group.biomass.push(row.get("biomass_fresh")?);
            }

            if groups.is_empty() {
                return Ok(None);
            }

            let rows = groups
                .into_iter()
                .map(|(treatment_name, readings)| GrowthRow {
                    treatment_name,
                    plant_height: Spread::of(&readings.height),
                    leaf_area: Spread::of(&readings.leaf_area),
                    biomass_fresh: Spread::of(&readings.biomass),
                })
                .collect();
            Ok(Some(GrowthSummary { rows }))
        })
    }
}
