//! Formatting helpers shared by front ends.

use crate::analytics::{GrowthRate, MeasurementSummary};

/// Placeholder printed for absent values
pub const MISSING: &str = "-";

/// Format an optional reading with two decimals and a unit suffix.
pub fn format_reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => format!("{:.2}", v),
        Some(v) => format!("{:.2} {}", v, unit),
        None => MISSING.to_string(),
    }
}

/// Format optional text, or the placeholder if missing or blank.
pub fn format_text(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => MISSING.to_string(),
    }
}

/// Multi-line growth rate summary
pub fn format_growth_rate(rate: &GrowthRate) -> String {
    format!(
        "Growth Rate: {:.2} cm/day\nPeriod: {} days\nInitial Height: {:.2} cm\nFinal Height: {:.2} cm",
        rate.rate_per_day, rate.period_days, rate.initial_height, rate.final_height
    )
}

/// One-line treatment summary, e.g. `Avg Height: 12.50cm | Avg Water: 80.00%`.
///
/// Readings without data are left out.
pub fn format_measurement_summary(summary: &MeasurementSummary) -> String {
    let mut parts = vec![format!("Measurements: {}", summary.count)];
    if let Some(h) = summary.avg_height {
        parts.push(format!("Avg Height: {:.2}cm", h));
    }
    if let Some(a) = summary.avg_leaf_area {
        parts.push(format!("Avg Leaf Area: {:.2}cm²", a));
    }
    if let Some(w) = summary.avg_water_content {
        parts.push(format!("Avg Water: {:.2}%", w));
    }
    parts.join(" | ")
}
