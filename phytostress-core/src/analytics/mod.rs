//! Analytics module for phytostress
//!
//! Aggregate queries over one experiment:
//! - Growth summary (mean and spread of height, leaf area, fresh biomass)
//! - Stress impact comparison across treatments
//! - Per-treatment statistics
//! - Date-ordered timelines
//! - Export bundles and per-treatment growth rates
//!
//! Every operation goes through [`Analyzer`], which borrows a [`Store`].
//! Operations never fail at the Rust level: a query error is logged and the
//! caller sees `None`, the same as "nothing to show".

pub mod bundle;
pub mod growth;
pub mod impact;
pub mod statistics;
pub mod table;
pub mod timeline;

pub use bundle::{ExportBundle, MeasurementRecord};
pub use growth::{GrowthRow, GrowthSummary, Spread};
pub use impact::{ImpactRow, StressImpactSummary};
pub use statistics::{
    GrowthRate, MeasurementSummary, StatisticsRow, StatisticsSummary,
};
pub use table::{Cell, Table, ToTable};
pub use timeline::{TimelinePoint, TimelineSeries, TreatmentTimeline};

use crate::db::Store;
use crate::error::Result;

/// Read-only aggregate queries over a borrowed store.
#[derive(Clone, Copy)]
pub struct Analyzer<'a> {
    store: &'a Store,
}

impl<'a> Analyzer<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &'a Store {
        self.store
    }

    /// Run one aggregate query, turning any error into a logged `None`.
    fn guarded<T>(
        &self,
        operation: &'static str,
        id: i64,
        query: impl FnOnce() -> Result<Option<T>>,
    ) -> Option<T> {
        match query() {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(operation, id, error = %e, "Analysis query failed");
                None
            }
        }
    }
}

/// Arithmetic mean, or None for no values
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1), or None for fewer than two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::Store;
    use crate::types::*;

    pub struct Fixture {
        pub store: Store,
        pub experiment_id: i64,
        pub control_id: i64,
        pub drought_id: i64,
    }

    /// EXP001 with an empty "Control" and a "Drought-High" measured twice
    pub fn exp001() -> Fixture {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();

        let experiment_id = store
            .add_experiment(&NewExperiment::new(
                "EXP001",
                "Drought response",
                "Arabidopsis thaliana",
                "drought",
            ))
            .inserted_id()
            .unwrap();
        let control_id = store
            .add_treatment(
                &NewTreatment::new(experiment_id, "Control", TreatmentType::Control)
                    .with_stress_level(StressLevel::Control),
            )
            .inserted_id()
            .unwrap();
        let drought_id = store
            .add_treatment(
                &NewTreatment::new(experiment_id, "Drought-High", TreatmentType::Drought)
                    .with_stress_level(StressLevel::High),
            )
            .inserted_id()
            .unwrap();

        for (date, height) in [("2024-01-01", 10.0), ("2024-01-15", 15.0)] {
            let readings = Readings {
                plant_height: Some(height),
                ..Default::default()
            };
            store
                .add_measurement(&NewMeasurement::new(drought_id, date, readings))
                .inserted_id()
                .unwrap();
        }

        Fixture {
            store,
            experiment_id,
            control_id,
            drought_id,
        }
    }

    pub fn add_reading(store: &Store, treatment_id: i64, date: &str, readings: Readings) {
        store
            .add_measurement(&NewMeasurement::new(treatment_id, date, readings))
            .inserted_id()
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 15.0]), Some(12.5));
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[4.0]), None);
        let sd = sample_std_dev(&[10.0, 15.0]).unwrap();
        assert!((sd - 3.5355339).abs() < 1e-6);
        assert_eq!(sample_std_dev(&[2.0, 2.0, 2.0]), Some(0.0));
    }

    #[test]
    fn test_query_error_becomes_none() {
        crate::logging::init_test();
        let store = Store::open_in_memory().unwrap();
        // No tables: every aggregate query fails
        let analyzer = Analyzer::new(&store);
        assert!(analyzer.statistics_summary(1).is_none());
        assert!(analyzer.growth_summary(1).is_none());
        assert!(analyzer.export_bundle(1).is_none());
    }
}
