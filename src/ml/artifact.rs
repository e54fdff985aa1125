//! Versioned model manifest.
//!
//! The scaler constants, category vocabulary and expected column order are
//! pinned to the classifier they were trained with, so they ship together in
//! one manifest instead of being recomputed at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::{CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use crate::error::{Result, RiskError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    pub model_name: String,
    pub preprocessing: PreprocessingSpec,
    pub classifier: ClassifierSource,
}

/// Where the classifier weights live. Paths are relative to the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ClassifierSource {
    /// JSON multilayer perceptron, see [`crate::ml::DenseNetwork`].
    Dense { path: PathBuf },
    /// ONNX graph taking a `[1, n_features]` f32 tensor.
    Onnx { path: PathBuf },
}

impl ClassifierSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Dense { path } | Self::Onnx { path } => path,
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            Self::Dense { .. } => "dense",
            Self::Onnx { .. } => "onnx",
        }
    }
}

/// Standardization constants for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerColumn {
    pub column: String,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingSpec {
    pub numeric: Vec<ScalerColumn>,
    pub categorical: Vec<String>,
    pub expected_features: Vec<String>,
}

impl PreprocessingSpec {
    /// The contract the production CatBoost model was trained against.
    ///
    /// Its scaler was fit on a single all-zero row: mean 0 and zero variance,
    /// which a standard scaler turns into a unit scale. Keeping mean=0/std=1
    /// reproduces that transform exactly.
    pub fn legacy() -> Self {
        let numeric = NUMERIC_COLUMNS
            .iter()
            .map(|c| ScalerColumn {
                column: c.to_string(),
                mean: 0.0,
                std: 1.0,
            })
            .collect();

        let mut expected_features: Vec<String> =
            NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        expected_features.extend(
            [
                "DAM_TYPE_Dam",
                "DAM_TYPE_Lake Control Dam",
                "DAM_TYPE_Lock",
                "DAM_TYPE_Low Permeable Dam",
                "INSTREAM_Instream",
                "INSTREAM_Offstream",
            ]
            .iter()
            .map(|c| c.to_string()),
        );

        Self {
            numeric,
            categorical: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            expected_features,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.numeric.len() != NUMERIC_COLUMNS.len() {
            return Err(format!(
                "numeric scaler has {} columns, expected {}",
                self.numeric.len(),
                NUMERIC_COLUMNS.len()
            ));
        }
        for (idx, (col, expected)) in self.numeric.iter().zip(NUMERIC_COLUMNS).enumerate() {
            if col.column != expected {
                return Err(format!(
                    "numeric[{idx}] is {:?}, expected {expected:?}",
                    col.column
                ));
            }
            if !col.mean.is_finite() {
                return Err(format!("{expected} mean must be finite"));
            }
            if !col.std.is_finite() || col.std < 0.0 {
                return Err(format!("{expected} std must be finite and >= 0"));
            }
        }

        let mut seen = HashSet::new();
        for field in &self.categorical {
            if !CATEGORICAL_COLUMNS.contains(&field.as_str()) {
                return Err(format!("unknown categorical column {field:?}"));
            }
            if !seen.insert(field.as_str()) {
                return Err(format!("categorical column {field:?} listed twice"));
            }
        }

        if self.expected_features.is_empty() {
            return Err("expected_features must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for name in &self.expected_features {
            if !seen.insert(name.as_str()) {
                return Err(format!("expected feature {name:?} listed twice"));
            }
        }
        Ok(())
    }

    /// Known categories for `field`, in the order they appear in
    /// `expected_features`.
    pub fn vocabulary(&self, field: &str) -> Vec<&str> {
        if !self.categorical.iter().any(|c| c == field) {
            return Vec::new();
        }
        self.expected_features
            .iter()
            .filter_map(|name| self.split_indicator(name))
            .filter(|(f, _)| *f == field)
            .map(|(_, category)| category)
            .collect()
    }

    /// Split an indicator column `{field}_{category}` into its parts.
    ///
    /// The longest matching field prefix wins.
    pub fn split_indicator<'a>(&self, name: &'a str) -> Option<(&'a str, &'a str)> {
        if NUMERIC_COLUMNS.contains(&name) {
            return None;
        }
        self.categorical
            .iter()
            .filter(|field| {
                name.len() > field.len() + 1
                    && name.starts_with(field.as_str())
                    && name.as_bytes()[field.len()] == b'_'
            })
            .max_by_key(|field| field.len())
            .map(|field| name.split_at(field.len()))
            .map(|(field, rest)| (field, &rest[1..]))
    }
}

impl ModelManifest {
    /// Read and validate a manifest. The classifier path is resolved against
    /// the manifest's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut manifest: Self = serde_json::from_str(&content)?;
        manifest.validate().map_err(RiskError::Artifact)?;

        if let Some(dir) = path.parent() {
            let resolved = dir.join(manifest.classifier.path());
            manifest.classifier = match manifest.classifier {
                ClassifierSource::Dense { .. } => ClassifierSource::Dense { path: resolved },
                ClassifierSource::Onnx { .. } => ClassifierSource::Onnx { path: resolved },
            };
        }
        Ok(manifest)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.version.trim().is_empty() {
            return Err("version must not be empty".to_string());
        }
        if self.model_name.trim().is_empty() {
            return Err("model_name must not be empty".to_string());
        }
        self.preprocessing.validate()
    }

    /// Identifier reported alongside predictions.
    pub fn model_id(&self) -> String {
        format!("{} ({})", self.model_name, self.version)
    }
}
