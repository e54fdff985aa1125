//! Feature normalization: raw attributes to the exact column vector the
//! classifier was trained on.
//!
//! 1. numeric columns are standardized with the pinned scaler constants;
//! 2. each categorical column becomes one `{field}_{category}` indicator
//!    set to 1.0;
//! 3. the result is reindexed to `expected_features`: missing columns are
//!    0.0, columns not in the list are dropped.
//!
//! Steps 2 and 3 are fused into a per-column plan compiled once from the
//! [`PreprocessingSpec`].

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{RiskFeatures, NUMERIC_COLUMNS};
use crate::error::{Result, RiskError};
use crate::ml::artifact::PreprocessingSpec;

/// Smallest std treated as non-zero. Below this the column is left unscaled,
/// matching how a standard scaler handles zero-variance columns.
const MIN_SCALE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
enum ColumnSource {
    /// Index into `NUMERIC_COLUMNS`.
    Numeric(usize),
    /// 1.0 when the input's value for `field` equals `category`.
    Indicator { field: String, category: String },
    /// Named by the artifact but never produced.
    Zero,
}

/// Ordered, named vector handed to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
    unseen: Vec<UnseenCategory>,
}

/// A categorical value outside the training-time vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenCategory {
    pub field: String,
    pub value: String,
}

impl NormalizedFeatureVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    /// Categorical inputs that matched no indicator column.
    pub fn unseen_categories(&self) -> &[UnseenCategory] {
        &self.unseen
    }
}

#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    means: [f64; 11],
    scales: [f64; 11],
    categorical: Vec<String>,
    vocabulary: Vec<(String, Vec<String>)>,
    names: Arc<[String]>,
    plan: Vec<ColumnSource>,
    /// Numeric columns scaled but absent from the expected list.
    dropped_numeric: usize,
}

impl FeatureNormalizer {
    pub fn new(spec: &PreprocessingSpec) -> Result<Self> {
        spec.validate().map_err(RiskError::Artifact)?;

        let mut means = [0.0; 11];
        let mut scales = [1.0; 11];
        for (idx, col) in spec.numeric.iter().enumerate() {
            means[idx] = col.mean;
            scales[idx] = if col.std < MIN_SCALE { 1.0 } else { col.std };
        }

        let mut plan = Vec::with_capacity(spec.expected_features.len());
        for name in &spec.expected_features {
            let source = if let Some(idx) = NUMERIC_COLUMNS.iter().position(|c| *c == name.as_str()) {
                ColumnSource::Numeric(idx)
            } else if let Some((field, category)) = spec.split_indicator(name) {
                ColumnSource::Indicator {
                    field: field.to_string(),
                    category: category.to_string(),
                }
            } else {
                warn!(column = %name, "expected feature matches no input column, it will always be 0");
                ColumnSource::Zero
            };
            plan.push(source);
        }

        let dropped_numeric = NUMERIC_COLUMNS.len()
            - plan
                .iter()
                .filter(|s| matches!(s, ColumnSource::Numeric(_)))
                .count();

        let vocabulary = spec
            .categorical
            .iter()
            .map(|field| {
                let cats = spec
                    .vocabulary(field)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (field.clone(), cats)
            })
            .collect();

        Ok(Self {
            means,
            scales,
            categorical: spec.categorical.clone(),
            vocabulary,
            names: spec.expected_features.clone().into(),
            plan,
            dropped_numeric,
        })
    }

    /// Column names in classifier order.
    pub fn expected_features(&self) -> &[String] {
        &self.names
    }

    /// Numeric inputs with no column in `expected_features`.
    pub fn dropped_numeric(&self) -> usize {
        self.dropped_numeric
    }

    pub fn vocabulary(&self, field: &str) -> Option<&[String]> {
        self.vocabulary
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, cats)| cats.as_slice())
    }

    /// Standardize a single numeric column.
    pub fn scale(&self, idx: usize, value: f64) -> f64 {
        (value - self.means[idx]) / self.scales[idx]
    }

    pub fn normalize(&self, features: &RiskFeatures) -> Result<NormalizedFeatureVector> {
        let raw = features.numeric_values();
        if let Some(idx) = raw.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::Validation(format!(
                "{} must be a finite number",
                NUMERIC_COLUMNS[idx]
            )));
        }

        let mut values = Vec::with_capacity(self.plan.len());
        for source in &self.plan {
            let v = match source {
                ColumnSource::Numeric(idx) => self.scale(*idx, raw[*idx]),
                ColumnSource::Indicator { field, category } => {
                    if features.categorical(field) == Some(category.as_str()) {
                        1.0
                    } else {
                        0.0
                    }
                }
                ColumnSource::Zero => 0.0,
            };
            values.push(v);
        }

        let mut unseen = Vec::new();
        for field in &self.categorical {
            let Some(value) = features.categorical(field) else {
                continue;
            };
            if value.is_empty() {
                return Err(RiskError::Validation(format!("{field} must not be empty")));
            }
            let known = self
                .vocabulary(field)
                .is_some_and(|cats| cats.iter().any(|c| c == value));
            if !known {
                unseen.push(UnseenCategory {
                    field: field.clone(),
                    value: value.to_string(),
                });
            }
        }

        if self.dropped_numeric > 0 || !unseen.is_empty() {
            debug!(
                dropped_numeric = self.dropped_numeric,
                unseen_categories = unseen.len(),
                "input values with no expected_features column"
            );
        }

        Ok(NormalizedFeatureVector {
            names: Arc::clone(&self.names),
            values,
            unseen,
        })
    }
}
