//! Per-treatment statistics and single-treatment summaries.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::table::{Cell, Table, ToTable};
use super::{sample_std_dev, Analyzer};

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsRow {
    pub treatment_id: i64,
    pub treatment_name: String,
    pub total_measurements: i64,
    pub avg_height: Option<f64>,
    pub std_height: Option<f64>,
    pub avg_leaf_area: Option<f64>,
    pub avg_water_content: Option<f64>,
    pub avg_chlorophyll: Option<f64>,
    /// Earliest measurement date
    pub first_date: Option<String>,
    /// Latest measurement date
    pub last_date: Option<String>,
}

/// One row per treatment of the experiment, ordered by treatment name.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSummary {
    pub rows: Vec<StatisticsRow>,
}

impl StatisticsSummary {
    pub fn get(&self, treatment_name: &str) -> Option<&StatisticsRow> {
        self.rows.iter().find(|r| r.treatment_name == treatment_name)
    }
}

impl ToTable for StatisticsSummary {
    const DEFAULT_PLACES: u32 = 3;

    fn raw_table(&self) -> Table {
        let mut table = Table::new(
            "Statistics",
            &[
                "treatment_name",
                "total_measurements",
                "avg_height",
                "std_height",
                "avg_leaf_area",
                "avg_water_content",
                "avg_chlorophyll",
                "first_date",
                "last_date",
            ],
        );
        for row in &self.rows {
            table.push_row(vec![
                Cell::from(row.treatment_name.as_str()),
                row.total_measurements.into(),
                row.avg_height.into(),
                row.std_height.into(),
                row.avg_leaf_area.into(),
                row.avg_water_content.into(),
                row.avg_chlorophyll.into(),
                row.first_date.clone().into(),
                row.last_date.clone().into(),
            ]);
        }
        table
    }
}

/// Height change per day between the first and last height readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthRate {
    /// cm per day
    pub rate_per_day: f64,
    pub period_days: i64,
    pub initial_height: f64,
    pub final_height: f64,
}

/// Means over all measurements of one treatment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSummary {
    pub count: i64,
    pub avg_height: Option<f64>,
    pub avg_leaf_area: Option<f64>,
    pub avg_water_content: Option<f64>,
}

impl Analyzer<'_> {
    /// Count, means, height spread and observation window per treatment.
    ///
    /// Treatments without measurements report a count of 0 and null
    /// aggregates. Returns None when the experiment has no treatments.
    pub fn statistics_summary(&self, experiment_id: i64) -> Option<StatisticsSummary> {
        self.guarded("statistics_summary", experiment_id, || {
            let conn = self.store().connection();

            // SQLite has no STDDEV aggregate; collect heights and compute it here
            let mut heights: HashMap<i64, Vec<f64>> = HashMap::new();
            let mut stmt = conn.prepare(
                r#"
                SELECT m.treatment_id, m.plant_height
                FROM measurements m
                JOIN treatments t ON m.treatment_id = t.id
                WHERE t.experiment_id = ? AND m.plant_height IS NOT NULL
                "#,
            )?;
            let mut rows = stmt.query([experiment_id])?;
            while let Some(row) = rows.next()? {
                heights
                    .entry(row.get("treatment_id")?)
                    .or_default()
                    .push(row.get("plant_height")?);
            }

            let mut stmt = conn.prepare(
                r#"
                SELECT t.id AS treatment_id, t.treatment_name,
                       COUNT(m.id) AS total_measurements,
                       AVG(m.plant_height) AS avg_height,
                       AVG(m.leaf_area) AS avg_leaf_area,
                       AVG(m.water_content) AS avg_water_content,
                       AVG(m.chlorophyll_content) AS avg_chlorophyll,
                       MIN(m.measurement_date) AS first_date,
                       MAX(m.measurement_date) AS last_date
                FROM treatments t
                LEFT JOIN measurements m ON t.id = m.treatment_id
                WHERE t.experiment_id = ?
                GROUP BY t.id, t.treatment_name
                ORDER BY t.treatment_name
                "#,
            )?;
            let rows = stmt
                .query_map([experiment_id], |row| {
                    let treatment_id: i64 = row.get("treatment_id")?;
                    Ok(StatisticsRow {
                        treatment_id,
                        treatment_name: row.get("treatment_name")?,
                        total_measurements: row.get("total_measurements")?,
                        avg_height: row.get("avg_height")?,
                        std_height: heights
                            .get(&treatment_id)
                            .and_then(|values| sample_std_dev(values)),
                        avg_leaf_area: row.get("avg_leaf_area")?,
                        avg_water_content: row.get("avg_water_content")?,
                        avg_chlorophyll: row.get("avg_chlorophyll")?,
                        first_date: row.get("first_date")?,
                        last_date: row.get("last_date")?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if rows.is_empty() {
                Ok(None)
            } else {
                Ok(Some(StatisticsSummary { rows }))
            }
        })
    }

    /// Growth rate of one treatment from its first and last height readings.
    ///
    /// None with fewer than two readings, a zero-day period, or dates that
    /// are not `YYYY-MM-DD`.
    pub fn growth_rate(&self, treatment_id: i64) -> Option<GrowthRate> {
        self.guarded("growth_rate", treatment_id, || {
            let mut stmt = self.store().connection().prepare(
                r#"
                SELECT measurement_date, plant_height
                FROM measurements
                WHERE treatment_id = ? AND plant_height IS NOT NULL
                ORDER BY measurement_date, id
                "#,
            )?;
            let readings = stmt
                .query_map([treatment_id], |row| {
                    Ok((
                        row.get::<_, String>("measurement_date")?,
                        row.get::<_, f64>("plant_height")?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let (Some(first), Some(last)) = (readings.first(), readings.last()) else {
                return Ok(None);
            };
            if readings.len() < 2 {
                return Ok(None);
            }

            let parse = |date: &str| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
            let (Some(start), Some(end)) = (parse(&first.0), parse(&last.0)) else {
                tracing::debug!(treatment_id, "Unparseable measurement date, no growth rate");
                return Ok(None);
            };

            let period_days = (end - start).num_days();
            if period_days <= 0 {
                return Ok(None);
            }

            Ok(Some(GrowthRate {
                rate_per_day: (last.1 - first.1) / period_days as f64,
                period_days,
                initial_height: first.1,
                final_height: last.1,
            }))
        })
    }

    /// Mean height, leaf area and water content of one treatment.
    ///
    /// None when the treatment has no measurements.
    pub fn measurement_summary(&self, treatment_id: i64) -> Option<MeasurementSummary> {
        self.guarded("measurement_summary", treatment_id, || {
            let summary = self.store().connection().query_row(
                r#"
                SELECT COUNT(*) AS count,
                       AVG(plant_height) AS avg_height,
                       AVG(leaf_area) AS avg_leaf_area,
                       AVG(water_content) AS avg_water_content
                FROM measurements
                WHERE treatment_id = ?
                "#,
                [treatment_id],
                |row| {
                    Ok(MeasurementSummary {
                        count: row.get("count")?,
                        avg_height: row.get("avg_height")?,
                        avg_leaf_area: row.get("avg_leaf_area")?,
                        avg_water_content: row.get("avg_water_content")?,
                    })
                },
            )?;

            Ok((summary.count > 0).then_some(summary))
        })
    }
}
