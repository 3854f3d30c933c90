//! Stress impact: how each treatment compares on the key readings.

use super::table::{Cell, Table, ToTable};
use super::Analyzer;

#[derive(Debug, Clone, PartialEq)]
pub struct ImpactRow {
    pub treatment_name: String,
    pub treatment_type: String,
    pub stress_level: Option<String>,
    pub avg_height: Option<f64>,
    pub avg_leaf_area: Option<f64>,
    pub avg_water_content: Option<f64>,
    pub measurement_count: i64,
}

/// Every treatment of an experiment, measured or not, ordered by treatment
/// type then stress level.
#[derive(Debug, Clone, PartialEq)]
pub struct StressImpactSummary {
    pub rows: Vec<ImpactRow>,
}

impl ToTable for StressImpactSummary {
    const DEFAULT_PLACES: u32 = 2;

    fn raw_table(&self) -> Table {
        let mut table = Table::new(
            "Stress Impact",
            &[
                "treatment_name",
                "treatment_type",
                "stress_level",
                "avg_height",
                "avg_leaf_area",
                "avg_water_content",
                "measurement_count",
            ],
        );
        for row in &self.rows {
            table.push_row(vec![
                Cell::from(row.treatment_name.as_str()),
                Cell::from(row.treatment_type.as_str()),
                row.stress_level.clone().into(),
                row.avg_height.into(),
                row.avg_leaf_area.into(),
                row.avg_water_content.into(),
                row.measurement_count.into(),
            ]);
        }
        table
    }
}

impl Analyzer<'_> {
    /// Mean height, leaf area and water content plus measurement count for
    /// every treatment of the experiment.
    ///
    /// Treatments without measurements stay in the result with a count of 0.
    /// Returns None when the experiment has no treatments.
    pub fn stress_impact_summary(&self, experiment_id: i64) -> Option<StressImpactSummary> {
        self.guarded("stress_impact_summary", experiment_id, || {
            let mut stmt = self.store().connection().prepare(
                r#"
                SELECT t.treatment_name, t.treatment_type, t.stress_level,
                       AVG(m.plant_height) AS avg_height,
                       AVG(m.leaf_area) AS avg_leaf_area,
                       AVG(m.water_content) AS avg_water_content,
                       COUNT(m.id) AS measurement_count
                FROM treatments t
                LEFT JOIN measurements m ON t.id = m.treatment_id
                WHERE t.experiment_id = ?
                GROUP BY t.id, t.treatment_name, t.treatment_type, t.stress_level
                ORDER BY t.treatment_type, t.stress_level, t.treatment_name
                "#,
            )?;

            let rows = stmt
                .query_map([experiment_id], |row| {
                    Ok(ImpactRow {
                        treatment_name: row.get("treatment_name")?,
                        treatment_type: row.get("treatment_type")?,
                        stress_level: row.get("stress_level")?,
                        avg_height: row.get("avg_height")?,
                        avg_leaf_area: row.get("avg_leaf_area")?,
                        avg_water_content: row.get("avg_water_content")?,
                        measurement_count: row.get("measurement_count")?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if rows.is_empty() {
                Ok(None)
            } else {
                Ok(Some(StressImpactSummary { rows }))
            }
        })
    }
}
