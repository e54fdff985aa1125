use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

/// A stored dam observation. Raw rows may hold `None` or sentinel values
/// (e.g. `-99`) for unknown measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: i32,
    #[serde(rename = "CAP_MCM")]
    pub cap_mcm: Option<f64>,
    #[serde(rename = "CAP_MAX")]
    pub cap_max: Option<f64>,
    #[serde(rename = "CAP_MIN")]
    pub cap_min: Option<f64>,
    #[serde(rename = "AREA_SKM")]
    pub area_skm: Option<f64>,
    #[serde(rename = "AREA_MAX")]
    pub area_max: Option<f64>,
    #[serde(rename = "DEPTH_M")]
    pub depth_m: Option<f64>,
    #[serde(rename = "CATCH_SKM")]
    pub catch_skm: Option<f64>,
    #[serde(rename = "DIS_AVG_LS")]
    pub dis_avg_ls: Option<f64>,
    #[serde(rename = "ELEV_MASL")]
    pub elev_masl: Option<f64>,
    #[serde(rename = "DAM_HGT_M")]
    pub dam_hgt_m: Option<f64>,
    #[serde(rename = "DAM_LEN_M")]
    pub dam_len_m: Option<f64>,
    #[serde(rename = "DAM_TYPE")]
    pub dam_type: Option<String>,
    #[serde(rename = "INSTREAM")]
    pub instream: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Query filter for listing stored observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturesFilter {
    pub cap_mcm_min: Option<f64>,
    pub cap_mcm_max: Option<f64>,
    pub cap_max_min: Option<f64>,
    pub cap_max_max: Option<f64>,
    pub area_skm_min: Option<f64>,
    pub area_skm_max: Option<f64>,
    pub depth_min: Option<f64>,
    pub depth_max: Option<f64>,
    pub elev_masl_min: Option<f64>,
    pub elev_masl_max: Option<f64>,
    pub dam_hgt_min: Option<f64>,
    pub dam_hgt_max: Option<f64>,
    pub dam_len_min: Option<f64>,
    pub dam_len_max: Option<f64>,
    /// Case-insensitive substring match
    pub dam_type: Option<String>,
    /// Case-insensitive substring match
    pub instream: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// A `(column, min, max)` bound on a numeric column.
pub type RangeBound = (&'static str, Option<f64>, Option<f64>);

impl FeaturesFilter {
    pub fn validate(&self) -> Result<()> {
        if let Some(skip) = self.skip {
            if skip < 0 {
                return Err(RiskError::Validation("skip must be >= 0".to_string()));
            }
        }
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIST_LIMIT).contains(&limit) {
                return Err(RiskError::Validation(format!(
                    "limit must be between 1 and {MAX_LIST_LIMIT}"
                )));
            }
        }
        Ok(())
    }

    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }

    /// Numeric range bounds paired with their storage column.
    pub fn ranges(&self) -> [RangeBound; 7] {
        [
            ("CAP_MCM", self.cap_mcm_min, self.cap_mcm_max),
            ("CAP_MAX", self.cap_max_min, self.cap_max_max),
            ("AREA_SKM", self.area_skm_min, self.area_skm_max),
            ("DEPTH_M", self.depth_min, self.depth_max),
            ("ELEV_MASL", self.elev_masl_min, self.elev_masl_max),
            ("DAM_HGT_M", self.dam_hgt_min, self.dam_hgt_max),
            ("DAM_LEN_M", self.dam_len_min, self.dam_len_max),
        ]
    }

    /// In-process evaluation, same semantics as the SQL filter.
    pub fn matches(&self, record: &FeatureRecord) -> bool {
        let values = [
            record.cap_mcm,
            record.cap_max,
            record.area_skm,
            record.depth_m,
            record.elev_masl,
            record.dam_hgt_m,
            record.dam_len_m,
        ];
        for ((_, min, max), value) in self.ranges().iter().zip(values) {
            if min.is_none() && max.is_none() {
                continue;
            }
            // SQL comparison against NULL never matches.
            let Some(v) = value else { return false };
            if min.is_some_and(|m| v < m) || max.is_some_and(|m| v > m) {
                return false;
            }
        }

        if !contains_ci(record.dam_type.as_deref(), self.dam_type.as_deref())
            || !contains_ci(record.instream.as_deref(), self.instream.as_deref())
        {
            return false;
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = record.date else { return false };
            if self.date_from.is_some_and(|d| date < d) || self.date_to.is_some_and(|d| date > d) {
                return false;
            }
        }
        true
    }
}

fn contains_ci(haystack: Option<&str>, needle: Option<&str>) -> bool {
    match needle.filter(|n| !n.is_empty()) {
        None => true,
        Some(n) => haystack.is_some_and(|h| h.to_lowercase().contains(&n.to_lowercase())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i32, dam_type: &str, hgt: Option<f64>) -> FeatureRecord {
        FeatureRecord {
            id,
            cap_mcm: Some(100.0),
            cap_max: Some(150.0),
            cap_min: Some(10.0),
            area_skm: Some(12.0),
            area_max: Some(18.0),
            depth_m: Some(20.0),
            catch_skm: Some(800.0),
            dis_avg_ls: Some(50.0),
            elev_masl: Some(500.0),
            dam_hgt_m: hgt,
            dam_len_m: Some(400.0),
            dam_type: Some(dam_type.to_string()),
            instream: Some("Yes".to_string()),
            date: NaiveDate::from_ymd_opt(2020, 5, 1),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FeaturesFilter::default();
        assert!(filter.matches(&record(1, "Gravity Dam", None)));
        assert_eq!(filter.skip(), 0);
        assert_eq!(filter.limit(), DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn range_and_substring_filters() {
        let filter = FeaturesFilter {
            dam_hgt_min: Some(30.0),
            dam_type: Some("gravity".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&record(1, "Gravity Dam", Some(35.0))));
        assert!(!filter.matches(&record(2, "Gravity Dam", Some(25.0))));
        assert!(!filter.matches(&record(3, "Lake Dam", Some(35.0))));
        assert!(!filter.matches(&record(4, "Gravity Dam", None)));
    }

    #[test]
    fn date_range() {
        let filter = FeaturesFilter {
            date_from: NaiveDate::from_ymd_opt(2021, 1, 1),
            ..Default::default()
        };
        assert!(!filter.matches(&record(1, "Dam", Some(1.0))));
    }

    #[test]
    fn rejects_out_of_range_paging() {
        let bad_limit = FeaturesFilter {
            limit: Some(1001),
            ..Default::default()
        };
        assert!(bad_limit.validate().is_err());
        let bad_skip = FeaturesFilter {
            skip: Some(-1),
            ..Default::default()
        };
        assert!(bad_skip.validate().is_err());
        assert!(FeaturesFilter::default().validate().is_ok());
    }
}
