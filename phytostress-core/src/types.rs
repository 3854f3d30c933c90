//! Core domain types for phytostress
//!
//! These types mirror the three persisted entities and the inputs used to
//! create or modify them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Experiment** | A named research study with a species and stress context |
//! | **Treatment** | An experimental condition (stress type, level, dose) nested under an Experiment |
//! | **Measurement** | One dated physiological observation nested under a Treatment |
//! | **Cascade delete** | Removing a parent row together with every row that references it |
//!
//! Field names on the serialized forms follow the JSON export document
//! (`code`, `name`, `species`, `type`, `date`, ...), while the SQL column names
//! keep their historical spelling (`experiment_code`, `treatment_type`,
//! `measurement_date`, ...). The mapping lives in [`crate::db::repo`].

use serde::{Deserialize, Serialize};

// ============================================
// Experiment
// ============================================

/// Default status assigned by the schema to new experiments.
pub const DEFAULT_EXPERIMENT_STATUS: &str = "active";

/// A stored experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Surrogate key
    pub id: i64,
    /// Unique experiment code (e.g. "EXP001")
    pub code: String,
    pub name: String,
    /// Plant species under study
    pub species: String,
    /// Free-form stress category of the whole study
    pub stress_type: String,
    pub researcher: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Input for inserting or updating an experiment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewExperiment {
    pub code: String,
    pub name: String,
    pub species: String,
    pub stress_type: String,
    pub researcher: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

impl NewExperiment {
    /// Create an input with the required fields set.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        species: impl Into<String>,
        stress_type: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            species: species.into(),
            stress_type: stress_type.into(),
            ..Default::default()
        }
    }
}

// ============================================
// Treatment
// ============================================

/// Kind of condition applied by a treatment.
///
/// New treatments use one of the named kinds. Text outside that set, as
/// found in older data files, is read back as [`TreatmentType::Other`] and
/// written out unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TreatmentType {
    Control,
    Drought,
    Salt,
    Heat,
    Cold,
    Flooding,
    NutrientDeficiency,
    Uv,
    Biotic,
    Combined,
    HeavyMetal,
    /// Stored text that is none of the above
    Other(String),
}

impl TreatmentType {
    /// Every named treatment type, in form order
    pub const ALL: [TreatmentType; 11] = [
        TreatmentType::Control,
        TreatmentType::Drought,
        TreatmentType::Salt,
        TreatmentType::Heat,
        TreatmentType::Cold,
        TreatmentType::Flooding,
        TreatmentType::NutrientDeficiency,
        TreatmentType::Uv,
        TreatmentType::Biotic,
        TreatmentType::Combined,
        TreatmentType::HeavyMetal,
    ];

    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &str {
        match self {
            TreatmentType::Control => "control",
            TreatmentType::Drought => "drought",
            TreatmentType::Salt => "salt",
            TreatmentType::Heat => "heat",
            TreatmentType::Cold => "cold",
            TreatmentType::Flooding => "flooding",
            TreatmentType::NutrientDeficiency => "nutrient_deficiency",
            TreatmentType::Uv => "UV",
            TreatmentType::Biotic => "biotic",
            TreatmentType::Combined => "combined",
            TreatmentType::HeavyMetal => "heavy_metal",
            TreatmentType::Other(s) => s.as_str(),
        }
    }

    /// Read stored text, keeping unknown values as [`TreatmentType::Other`]
    pub fn from_stored(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| TreatmentType::Other(s.to_string()))
    }
}

impl std::fmt::Display for TreatmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepts only the named kinds.
impl std::str::FromStr for TreatmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TreatmentType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .cloned()
            .ok_or_else(|| format!("unknown treatment type: {}", s))
    }
}

impl From<String> for TreatmentType {
    fn from(s: String) -> Self {
        TreatmentType::from_stored(&s)
    }
}

impl From<TreatmentType> for String {
    fn from(t: TreatmentType) -> Self {
        match t {
            TreatmentType::Other(s) => s,
            named => named.as_str().to_string(),
        }
    }
}

/// Intensity of the applied stress.
///
/// Unknown stored text reads back as [`StressLevel::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StressLevel {
    Low,
    #[default]
    Medium,
    High,
    Severe,
    Control,
    Other(String),
}

impl StressLevel {
    pub fn as_str(&self) -> &str {
        match self {
            StressLevel::Low => "low",
            StressLevel::Medium => "medium",
            StressLevel::High => "high",
            StressLevel::Severe => "severe",
            StressLevel::Control => "control",
            StressLevel::Other(s) => s.as_str(),
        }
    }

    pub fn from_stored(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| StressLevel::Other(s.to_string()))
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StressLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(StressLevel::Low),
            "medium" => Ok(StressLevel::Medium),
            "high" => Ok(StressLevel::High),
            "severe" => Ok(StressLevel::Severe),
            "control" => Ok(StressLevel::Control),
            _ => Err(format!("unknown stress level: {}", s)),
        }
    }
}

impl From<String> for StressLevel {
    fn from(s: String) -> Self {
        StressLevel::from_stored(&s)
    }
}

impl From<StressLevel> for String {
    fn from(level: StressLevel) -> Self {
        match level {
            StressLevel::Other(s) => s,
            named => named.as_str().to_string(),
        }
    }
}

/// A stored treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: i64,
    /// Owning experiment
    pub experiment_id: i64,
    /// Unique within the experiment
    pub name: String,
    #[serde(rename = "type")]
    pub treatment_type: TreatmentType,
    pub stress_level: Option<StressLevel>,
    pub concentration: Option<f64>,
    pub duration_days: Option<i64>,
    /// Temperature in °C
    pub temperature: Option<f64>,
    pub description: Option<String>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Input for inserting or updating a treatment.
///
/// A missing stress level is stored as [`StressLevel::Medium`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTreatment {
    pub experiment_id: i64,
    pub name: String,
    pub treatment_type: TreatmentType,
    pub stress_level: Option<StressLevel>,
    pub concentration: Option<f64>,
    pub duration_days: Option<i64>,
    pub temperature: Option<f64>,
    pub description: Option<String>,
}

impl NewTreatment {
    pub fn new(experiment_id: i64, name: impl Into<String>, treatment_type: TreatmentType) -> Self {
        Self {
            experiment_id,
            name: name.into(),
            treatment_type,
            stress_level: None,
            concentration: None,
            duration_days: None,
            temperature: None,
            description: None,
        }
    }

    pub fn with_stress_level(mut self, level: StressLevel) -> Self {
        self.stress_level = Some(level);
        self
    }

    /// Stress level as it will be stored
    pub fn effective_stress_level(&self) -> StressLevel {
        self.stress_level.clone().unwrap_or_default()
    }
}

// ============================================
// Measurement
// ============================================

/// The nine optional physiological readings of a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// Plant height in cm
    pub plant_height: Option<f64>,
    /// Leaf area in cm²
    pub leaf_area: Option<f64>,
    pub chlorophyll_content: Option<f64>,
    pub photosynthesis_rate: Option<f64>,
    pub stomatal_conductance: Option<f64>,
    pub root_length: Option<f64>,
    /// Fresh biomass in g
    pub biomass_fresh: Option<f64>,
    /// Dry biomass in g
    pub biomass_dry: Option<f64>,
    /// Water content in percent
    pub water_content: Option<f64>,
}

impl Readings {
    /// Returns true if at least one reading is present
    pub fn has_any(&self) -> bool {
        [
            self.plant_height,
            self.leaf_area,
            self.chlorophyll_content,
            self.photosynthesis_rate,
            self.stomatal_conductance,
            self.root_length,
            self.biomass_fresh,
            self.biomass_dry,
            self.water_content,
        ]
        .iter()
        .any(Option::is_some)
    }

    /// Water content derived from the biomass readings
    pub fn derived_water_content(&self) -> Option<f64> {
        match (self.biomass_fresh, self.biomass_dry) {
            (Some(fresh), Some(dry)) => water_content(fresh, dry),
            _ => None,
        }
    }
}

/// Percentage of fresh biomass lost on drying: `(fresh - dry) / fresh * 100`.
///
/// Undefined (None) unless `fresh` is positive.
pub fn water_content(fresh: f64, dry: f64) -> Option<f64> {
    if fresh > 0.0 {
        Some((fresh - dry) / fresh * 100.0)
    } else {
        None
    }
}

/// A stored measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    /// Owning treatment
    pub treatment_id: i64,
    /// Measurement date, `YYYY-MM-DD` by convention
    pub date: String,
    #[serde(flatten)]
    pub readings: Readings,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

/// Input for inserting or updating a measurement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMeasurement {
    pub treatment_id: i64,
    pub date: String,
    pub readings: Readings,
    pub notes: Option<String>,
}

impl NewMeasurement {
    pub fn new(treatment_id: i64, date: impl Into<String>, readings: Readings) -> Self {
        Self {
            treatment_id,
            date: date.into(),
            readings,
            notes: None,
        }
    }

    /// Fill a missing water content from the biomass readings.
    pub fn with_derived_water_content(mut self) -> Self {
        if self.readings.water_content.is_none() {
            self.readings.water_content = self.readings.derived_water_content();
        }
        self
    }

    /// Replace the water content with the value derived from the biomass
    /// readings. Without both biomass readings the current value stays.
    pub fn with_recomputed_water_content(mut self) -> Self {
        if let Some(derived) = self.readings.derived_water_content() {
            self.readings.water_content = Some(derived);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_content() {
        let wc = water_content(5.0, 1.0).unwrap();
        assert!((wc - 80.0).abs() < 1e-9);
        assert_eq!(format!("{:.2}", wc), "80.00");
        assert_eq!(water_content(0.0, 1.0), None);
    }

    #[test]
    fn test_derived_water_content_fills_only_missing() {
        let readings = Readings {
            biomass_fresh: Some(5.0),
            biomass_dry: Some(1.0),
            ..Default::default()
        };
        let m = NewMeasurement::new(1, "2024-01-01", readings).with_derived_water_content();
        assert_eq!(m.readings.water_content, Some(80.0));

        let explicit = Readings {
            water_content: Some(42.0),
            ..readings
        };
        let m = NewMeasurement::new(1, "2024-01-01", explicit).with_derived_water_content();
        assert_eq!(m.readings.water_content, Some(42.0));
    }

    #[test]
    fn test_recomputed_water_content() {
        let stale = Readings {
            biomass_fresh: Some(5.0),
            biomass_dry: Some(1.0),
            water_content: Some(42.0),
            ..Default::default()
        };
        let m = NewMeasurement::new(1, "2024-01-01", stale).with_recomputed_water_content();
        assert_eq!(m.readings.water_content, Some(80.0));

        // Nothing to derive from: the stored value is kept
        let height_only = Readings {
            plant_height: Some(12.0),
            water_content: Some(42.0),
            ..Default::default()
        };
        let m = NewMeasurement::new(1, "2024-01-01", height_only).with_recomputed_water_content();
        assert_eq!(m.readings.water_content, Some(42.0));
    }

    #[test]
    fn test_readings_has_any() {
        assert!(!Readings::default().has_any());
        let r = Readings {
            root_length: Some(3.2),
            ..Default::default()
        };
        assert!(r.has_any());
    }

    #[test]
    fn test_treatment_type_roundtrip() {
        for t in TreatmentType::ALL {
            assert_eq!(t.as_str().parse::<TreatmentType>().unwrap(), t);
        }
        assert_eq!("UV".parse::<TreatmentType>().unwrap(), TreatmentType::Uv);
        assert!("uv".parse::<TreatmentType>().is_err());
    }

    #[test]
    fn test_unknown_stored_text_is_kept() {
        let t = TreatmentType::from_stored("nutrient");
        assert_eq!(t, TreatmentType::Other("nutrient".to_string()));
        assert_eq!(t.as_str(), "nutrient");
        assert_eq!(TreatmentType::from_stored("salt"), TreatmentType::Salt);
        assert!("nutrient".parse::<TreatmentType>().is_err());

        assert_eq!(
            StressLevel::from_stored("extreme"),
            StressLevel::Other("extreme".to_string())
        );
        assert_eq!(serde_json::to_value(&t).unwrap(), "nutrient");
        let back: TreatmentType = serde_json::from_str("\"nutrient\"").unwrap();
        assert_eq!(back, t);
        let uv: TreatmentType = serde_json::from_str("\"UV\"").unwrap();
        assert_eq!(uv, TreatmentType::Uv);
    }

    #[test]
    fn test_stress_level_default_is_medium() {
        let t = NewTreatment::new(1, "Drought-Mild", TreatmentType::Drought);
        assert_eq!(t.effective_stress_level(), StressLevel::Medium);
        assert_eq!("severe".parse::<StressLevel>().unwrap(), StressLevel::Severe);
    }

    #[test]
    fn test_json_field_names() {
        let t = Treatment {
            id: 3,
            experiment_id: 1,
            name: "Salt-150".to_string(),
            treatment_type: TreatmentType::Salt,
            stress_level: Some(StressLevel::High),
            concentration: Some(150.0),
            duration_days: Some(21),
            temperature: None,
            description: None,
            created_at: None,
            updated_at: None,
        };
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["type"], "salt");
        assert_eq!(value["name"], "Salt-150");
        assert_eq!(value["stress_level"], "high");

        let m = Measurement {
            id: 1,
            treatment_id: 3,
            date: "2024-01-01".to_string(),
            readings: Readings {
                plant_height: Some(10.0),
                ..Default::default()
            },
            notes: None,
            created_at: None,
        };
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["date"], "2024-01-01");
        assert_eq!(value["plant_height"], 10.0);
        assert!(value["water_content"].is_null());
    }
}
