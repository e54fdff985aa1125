//! Risk scoring pipeline: registry → normalizer → assembler.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::LoadMode;
use crate::domain::{
    FeatureDefaults, FeatureRecord, PredictionResponse, RiskFeatures, RiskFeaturesInput,
    RiskPrediction,
};
use crate::error::{Result, RiskError};
use crate::ml::{LoadedModel, ModelRegistry, PredictionAssembler};

#[derive(Debug, Clone)]
pub struct RiskServiceConfig {
    pub load_mode: LoadMode,
    pub strict_categories: bool,
    pub defaults: FeatureDefaults,
}

impl Default for RiskServiceConfig {
    fn default() -> Self {
        Self {
            load_mode: LoadMode::Eager,
            strict_categories: false,
            defaults: FeatureDefaults::default(),
        }
    }
}

/// Stateless per call; the only shared state is the registry's model.
#[derive(Debug, Clone)]
pub struct RiskService {
    registry: Arc<ModelRegistry>,
    assembler: PredictionAssembler,
    config: RiskServiceConfig,
}

impl RiskService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        assembler: PredictionAssembler,
        config: RiskServiceConfig,
    ) -> Self {
        Self {
            registry,
            assembler,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn defaults(&self) -> &FeatureDefaults {
        &self.config.defaults
    }

    async fn model(&self) -> Result<Arc<LoadedModel>> {
        match self.config.load_mode {
            LoadMode::Eager => self.registry.get(),
            LoadMode::Lazy => self.registry.load().await,
        }
    }

    /// Score validated features.
    #[instrument(skip_all, fields(dam_type = %features.dam_type))]
    pub async fn predict(&self, features: &RiskFeatures) -> Result<RiskPrediction> {
        let model = self.model().await?;
        let vector = model.normalizer().normalize(features)?;

        for unseen in vector.unseen_categories() {
            if self.config.strict_categories {
                return Err(RiskError::Validation(format!(
                    "{} value {:?} is not in the model vocabulary",
                    unseen.field, unseen.value
                )));
            }
            warn!(
                field = %unseen.field,
                value = %unseen.value,
                "unknown category, indicator columns zero-filled"
            );
        }

        let prediction = self.assembler.assemble(model.classifier(), &vector)?;
        debug!(
            risk_class = prediction.risk_class,
            probability = prediction.risk_probability,
            confidence = %prediction.confidence,
            "risk scored"
        );
        Ok(prediction)
    }

    /// Validate wire input, then score it.
    pub async fn predict_input(&self, input: RiskFeaturesInput) -> Result<RiskPrediction> {
        let features = input.validate()?;
        self.predict(&features).await
    }

    /// Score a stored record after replacing sentinel values.
    pub async fn predict_record(&self, record: &FeatureRecord) -> Result<RiskPrediction> {
        let features = self.config.defaults.apply(record);
        self.predict(&features).await
    }

    /// Wire form with the model identifier attached.
    pub fn respond(&self, prediction: &RiskPrediction) -> PredictionResponse {
        let model = self.registry.get().ok().map(|m| m.manifest().model_id());
        PredictionResponse::from_prediction(prediction, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Confidence, RiskLevel};
    use crate::ml::classifier::{ClassifierOutput, RiskClassifier};
    use crate::ml::{ClassifierSource, ModelManifest, PreprocessingSpec};
    use std::path::PathBuf;
    use std::time::Duration;

    /// Returns a fixed answer and records what it saw.
    struct FixedClassifier {
        output: ClassifierOutput,
        seen: std::sync::Mutex<Vec<Vec<f64>>>,
    }

    impl RiskClassifier for FixedClassifier {
        fn input_dim(&self) -> usize {
            17
        }

        fn predict(&self, features: &[f64]) -> Result<ClassifierOutput> {
            self.seen.lock().unwrap().push(features.to_vec());
            Ok(self.output)
        }
    }

    fn model(class: u8, probability: f64) -> (LoadedModel, Arc<FixedClassifier>) {
        let clf = Arc::new(FixedClassifier {
            output: ClassifierOutput { class, probability },
            seen: Default::default(),
        });
        let manifest = ModelManifest {
            version: "1".to_string(),
            model_name: "CatBoost Dam Failure Risk Model".to_string(),
            preprocessing: PreprocessingSpec::legacy(),
            classifier: ClassifierSource::Dense {
                path: PathBuf::from("unused.json"),
            },
        };
        let loaded = LoadedModel::new(manifest, clf.clone()).unwrap();
        (loaded, clf)
    }

    fn service(class: u8, probability: f64, strict: bool) -> (RiskService, Arc<FixedClassifier>) {
        let (loaded, clf) = model(class, probability);
        let service = RiskService::new(
            Arc::new(ModelRegistry::preloaded(loaded)),
            PredictionAssembler::default(),
            RiskServiceConfig {
                strict_categories: strict,
                ..Default::default()
            },
        );
        (service, clf)
    }

    fn input() -> RiskFeaturesInput {
        serde_json::from_value(serde_json::json!({
            "CAP_MCM": 120.5, "CAP_MAX": 150.0, "CAP_MIN": 20.0,
            "AREA_SKM": 15.2, "AREA_MAX": 18.0, "DEPTH_M": 25.0,
            "CATCH_SKM": 850.0, "DIS_AVG_LS": 45.0, "ELEV_MASL": 520.0,
            "DAM_HGT_M": 38.0, "DAM_LEN_M": 420.0,
            "DAM_TYPE": "Бетонная", "INSTREAM": "Да"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn end_to_end_high_risk() {
        let (service, clf) = service(1, 0.89, false);
        let prediction = service.predict_input(input()).await.unwrap();
        let response = service.respond(&prediction);

        assert_eq!(response.risk_class, 1);
        assert_eq!(response.risk_level, RiskLevel::High);
        assert_eq!(response.risk_probability, 0.89);
        assert_eq!(response.confidence, Confidence::High);
        assert_eq!(
            response.model.as_deref(),
            Some("CatBoost Dam Failure Risk Model (1)")
        );

        let seen = clf.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 17);
        assert!(seen[0][11..].iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn strict_mode_rejects_unknown_category() {
        let (service, clf) = service(1, 0.89, true);
        let err = service.predict_input(input()).await.unwrap_err();
        assert!(matches!(err, RiskError::Validation(ref m) if m.contains("DAM_TYPE")));
        assert!(clf.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_path_applies_defaults() {
        let (service, clf) = service(0, 0.1, false);
        let record = FeatureRecord {
            id: 3,
            cap_mcm: Some(-99.0),
            cap_max: None,
            cap_min: None,
            area_skm: None,
            area_max: None,
            depth_m: None,
            catch_skm: None,
            dis_avg_ls: None,
            elev_masl: None,
            dam_hgt_m: Some(-99.0),
            dam_len_m: None,
            dam_type: Some("Lock".to_string()),
            instream: None,
            date: None,
        };
        let prediction = service.predict_record(&record).await.unwrap();
        assert_eq!(prediction.risk_level, RiskLevel::Low);

        let seen = clf.seen.lock().unwrap();
        assert_eq!(seen[0][0], 100.0);
        assert_eq!(seen[0][9], 35.0);
        // DAM_TYPE_Lock
        assert_eq!(seen[0][13], 1.0);
    }

    #[tokio::test]
    async fn eager_mode_reports_unavailable_until_loaded() {
        let (loaded, _) = model(1, 0.9);
        let slot = std::sync::Mutex::new(Some(loaded));
        let registry = Arc::new(ModelRegistry::with_loader(
            move || {
                slot.lock()
                    .unwrap()
                    .take()
                    .ok_or_else(|| RiskError::Internal("already taken".to_string()))
            },
            Duration::from_secs(5),
        ));
        let service = RiskService::new(
            Arc::clone(&registry),
            PredictionAssembler::default(),
            RiskServiceConfig::default(),
        );
        let features = input().validate().unwrap();

        assert!(matches!(
            service.predict(&features).await,
            Err(RiskError::ModelUnavailable(_))
        ));
        registry.load().await.unwrap();
        assert!(service.predict(&features).await.is_ok());
    }

    #[tokio::test]
    async fn lazy_mode_loads_on_first_request() {
        let registry = Arc::new(ModelRegistry::with_loader(
            || Ok(model(0, 0.3).0),
            Duration::from_secs(5),
        ));
        let service = RiskService::new(
            Arc::clone(&registry),
            PredictionAssembler::default(),
            RiskServiceConfig {
                load_mode: LoadMode::Lazy,
                ..Default::default()
            },
        );
        let features = input().validate().unwrap();
        service.predict(&features).await.unwrap();
        service.predict(&features).await.unwrap();
        assert_eq!(registry.load_attempts(), 1);
    }

    #[tokio::test]
    async fn repeated_calls_are_bit_identical() {
        let (service, clf) = service(1, 0.73, false);
        let features = input().validate().unwrap();
        let a = service.predict(&features).await.unwrap();
        let b = service.predict(&features).await.unwrap();
        assert_eq!(a, b);
        let seen = clf.seen.lock().unwrap();
        let bits = |v: &Vec<f64>| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&seen[0]), bits(&seen[1]));
    }
}
