//! Risk classifier input attributes.
//!
//! `RiskFeaturesInput` is what arrives over the wire: every field optional so
//! that validation can report all problems at once. `RiskFeatures` is the
//! validated, immutable record handed to the normalizer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Numeric columns in the order the classifier was trained on.
pub const NUMERIC_COLUMNS: [&str; 11] = [
    "CAP_MCM",
    "CAP_MAX",
    "CAP_MIN",
    "AREA_SKM",
    "AREA_MAX",
    "DEPTH_M",
    "CATCH_SKM",
    "DIS_AVG_LS",
    "ELEV_MASL",
    "DAM_HGT_M",
    "DAM_LEN_M",
];

/// Categorical columns, expanded into `{column}_{category}` indicators.
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["DAM_TYPE", "INSTREAM"];

/// Columns that cannot be negative by physical meaning (capacity, area,
/// catchment, discharge). Negative raw values are unknown-value sentinels and
/// must be replaced by the caller before validation.
const NON_NEGATIVE_COLUMNS: [&str; 7] = [
    "CAP_MCM",
    "CAP_MAX",
    "CAP_MIN",
    "AREA_SKM",
    "AREA_MAX",
    "CATCH_SKM",
    "DIS_AVG_LS",
];

/// Validated classifier input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RiskFeatures {
    pub cap_mcm: f64,
    pub cap_max: f64,
    pub cap_min: f64,
    pub area_skm: f64,
    pub area_max: f64,
    pub depth_m: f64,
    pub catch_skm: f64,
    pub dis_avg_ls: f64,
    pub elev_masl: f64,
    pub dam_hgt_m: f64,
    pub dam_len_m: f64,
    pub dam_type: String,
    pub instream: String,
}

impl RiskFeatures {
    /// Numeric attributes in `NUMERIC_COLUMNS` order.
    pub fn numeric_values(&self) -> [f64; 11] {
        [
            self.cap_mcm,
            self.cap_max,
            self.cap_min,
            self.area_skm,
            self.area_max,
            self.depth_m,
            self.catch_skm,
            self.dis_avg_ls,
            self.elev_masl,
            self.dam_hgt_m,
            self.dam_len_m,
        ]
    }

    /// Value of a categorical column by its canonical name.
    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            "DAM_TYPE" => Some(self.dam_type.as_str()),
            "INSTREAM" => Some(self.instream.as_str()),
            _ => None,
        }
    }
}

/// Wire form of [`RiskFeatures`]. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RiskFeaturesInput {
    #[serde(default)]
    pub cap_mcm: Option<f64>,
    #[serde(default)]
    pub cap_max: Option<f64>,
    #[serde(default)]
    pub cap_min: Option<f64>,
    #[serde(default)]
    pub area_skm: Option<f64>,
    #[serde(default)]
    pub area_max: Option<f64>,
    #[serde(default)]
    pub depth_m: Option<f64>,
    #[serde(default)]
    pub catch_skm: Option<f64>,
    #[serde(default)]
    pub dis_avg_ls: Option<f64>,
    #[serde(default)]
    pub elev_masl: Option<f64>,
    #[serde(default)]
    pub dam_hgt_m: Option<f64>,
    #[serde(default)]
    pub dam_len_m: Option<f64>,
    #[serde(default)]
    pub dam_type: Option<String>,
    #[serde(default)]
    pub instream: Option<String>,
}

impl RiskFeaturesInput {
    fn numeric_slots(&self) -> [Option<f64>; 11] {
        [
            self.cap_mcm,
            self.cap_max,
            self.cap_min,
            self.area_skm,
            self.area_max,
            self.depth_m,
            self.catch_skm,
            self.dis_avg_ls,
            self.elev_masl,
            self.dam_hgt_m,
            self.dam_len_m,
        ]
    }

    /// Check presence and range sanity of every field.
    ///
    /// All problems are collected into a single `Validation` error so the
    /// caller sees the full list in one round-trip.
    pub fn validate(self) -> Result<RiskFeatures> {
        let mut errors = Vec::new();
        let mut values = [0.0_f64; 11];

        for (idx, (column, slot)) in NUMERIC_COLUMNS
            .iter()
            .zip(self.numeric_slots())
            .enumerate()
        {
            match slot {
                None => errors.push(format!("{column} is required")),
                Some(v) if !v.is_finite() => errors.push(format!("{column} must be a finite number")),
                Some(v) if v < 0.0 && NON_NEGATIVE_COLUMNS.contains(column) => {
                    errors.push(format!("{column} must be non-negative, got {v}"))
                }
                Some(v) => values[idx] = v,
            }
        }

        let dam_type = required_category("DAM_TYPE", self.dam_type, &mut errors);
        let instream = required_category("INSTREAM", self.instream, &mut errors);

        if !errors.is_empty() {
            return Err(RiskError::Validation(errors.join("; ")));
        }

        let [cap_mcm, cap_max, cap_min, area_skm, area_max, depth_m, catch_skm, dis_avg_ls, elev_masl, dam_hgt_m, dam_len_m] =
            values;

        Ok(RiskFeatures {
            cap_mcm,
            cap_max,
            cap_min,
            area_skm,
            area_max,
            depth_m,
            catch_skm,
            dis_avg_ls,
            elev_masl,
            dam_hgt_m,
            dam_len_m,
            dam_type,
            instream,
        })
    }
}

impl From<RiskFeatures> for RiskFeaturesInput {
    fn from(f: RiskFeatures) -> Self {
        Self {
            cap_mcm: Some(f.cap_mcm),
            cap_max: Some(f.cap_max),
            cap_min: Some(f.cap_min),
            area_skm: Some(f.area_skm),
            area_max: Some(f.area_max),
            depth_m: Some(f.depth_m),
            catch_skm: Some(f.catch_skm),
            dis_avg_ls: Some(f.dis_avg_ls),
            elev_masl: Some(f.elev_masl),
            dam_hgt_m: Some(f.dam_hgt_m),
            dam_len_m: Some(f.dam_len_m),
            dam_type: Some(f.dam_type),
            instream: Some(f.instream),
        }
    }
}

fn required_category(column: &str, value: Option<String>, errors: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        Some(_) => {
            errors.push(format!("{column} must not be empty"));
            String::new()
        }
        None => {
            errors.push(format!("{column} is required"));
            String::new()
        }
    }
}
