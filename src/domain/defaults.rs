//! Fallbacks for unknown measurements in stored observations.
//!
//! Imported datasets mark unknown values with negative sentinels (`-99`,
//! `-9999`). The normalizer never defaults anything itself; callers that build
//! features from stored rows run them through [`FeatureDefaults`] first.

use serde::Deserialize;

use super::features::RiskFeatures;
use super::record::FeatureRecord;

/// Any stored value at or below this is an unknown-value sentinel.
pub const SENTINEL_CEILING: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeatureDefaults {
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

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            cap_mcm: 100.0,
            cap_max: 150.0,
            cap_min: 10.0,
            area_skm: 12.0,
            area_max: 18.0,
            depth_m: 20.0,
            catch_skm: 800.0,
            dis_avg_ls: 50.0,
            elev_masl: 500.0,
            dam_hgt_m: 35.0,
            dam_len_m: 400.0,
            dam_type: "Gravity Dam".to_string(),
            instream: "Yes".to_string(),
        }
    }
}

impl FeatureDefaults {
    /// Build classifier input from a stored row, replacing sentinels.
    pub fn apply(&self, record: &FeatureRecord) -> RiskFeatures {
        RiskFeatures {
            cap_mcm: fix(record.cap_mcm, self.cap_mcm),
            cap_max: fix(record.cap_max, self.cap_max),
            cap_min: fix(record.cap_min, self.cap_min),
            area_skm: fix(record.area_skm, self.area_skm),
            area_max: fix(record.area_max, self.area_max),
            depth_m: fix(record.depth_m, self.depth_m),
            catch_skm: fix(record.catch_skm, self.catch_skm),
            dis_avg_ls: fix(record.dis_avg_ls, self.dis_avg_ls),
            elev_masl: fix(record.elev_masl, self.elev_masl),
            dam_hgt_m: fix(record.dam_hgt_m, self.dam_hgt_m),
            dam_len_m: fix(record.dam_len_m, self.dam_len_m),
            dam_type: fix_category(record.dam_type.as_deref(), &self.dam_type),
            instream: fix_category(record.instream.as_deref(), &self.instream),
        }
    }
}

fn fix(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > SENTINEL_CEILING => v,
        _ => default,
    }
}

fn fix_category(value: Option<&str>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}
