//! Date-ordered height and water content series per treatment.

use serde::Serialize;

use super::table::{Cell, Table, ToTable};
use super::Analyzer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: String,
    pub plant_height: Option<f64>,
    pub water_content: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentTimeline {
    pub treatment_name: String,
    pub points: Vec<TimelinePoint>,
}

/// Series in order of each treatment's first observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSeries {
    pub treatments: Vec<TreatmentTimeline>,
}

impl TimelineSeries {
    pub fn get(&self, treatment_name: &str) -> Option<&TreatmentTimeline> {
        self.treatments
            .iter()
            .find(|t| t.treatment_name == treatment_name)
    }
}

impl ToTable for TimelineSeries {
    const DEFAULT_PLACES: u32 = 2;

    fn raw_table(&self) -> Table {
        let mut table = Table::new(
            "Timeline",
            &["treatment_name", "date", "plant_height", "water_content"],
        );
        for series in &self.treatments {
            for point in &series.points {
                table.push_row(vec![
                    Cell::from(series.treatment_name.as_str()),
                    Cell::from(point.date.as_str()),
                    point.plant_height.into(),
                    point.water_content.into(),
                ]);
            }
        }
        table
    }
}

impl Analyzer<'_> {
    /// The `(date, height, water content)` sequence of every measured
    /// treatment. None when the experiment has no measurements.
    pub fn timeline_series(&self, experiment_id: i64) -> Option<TimelineSeries> {
        self.guarded("timeline_series", experiment_id, || {
            let mut stmt = self.store().connection().prepare(
                r#"
                SELECT t.treatment_name, m.measurement_date, m.plant_height, m.water_content
                FROM measurements m
                JOIN treatments t ON m.treatment_id = t.id
                WHERE t.experiment_id = ?
                ORDER BY m.measurement_date, m.id
                "#,
            )?;

            let mut treatments: Vec<TreatmentTimeline> = Vec::new();
            let mut rows = stmt.query([experiment_id])?;
            while let Some(row) = rows.next()? {
                let name: String = row.get("treatment_name")?;
                let point = TimelinePoint {
                    date: row.get("measurement_date")?,
                    plant_height: row.get("plant_height")?,
                    water_content: row.get("water_content")?,
                };

                match treatments.iter_mut().find(|t| t.treatment_name == name) {
                    Some(series) => series.points.push(point),
                    None => treatments.push(TreatmentTimeline {
                        treatment_name: name,
                        points: vec![point],
                    }),
                }
            }

            Ok((!treatments.is_empty()).then_some(TimelineSeries { treatments }))
        })
    }
}
