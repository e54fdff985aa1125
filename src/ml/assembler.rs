//! Turns a classifier answer into a risk judgment.

use tracing::error;

use crate::domain::{Confidence, RiskLevel, RiskPrediction};
use crate::error::{Result, RiskError};
use crate::ml::classifier::RiskClassifier;
use crate::ml::normalizer::NormalizedFeatureVector;

/// Confidence bands, symmetric around the 0.5 boundary.
///
/// `p >= high || p <= 1 - high` is high confidence, `p >= medium || p <= 1 -
/// medium` is medium, anything closer to 0.5 is low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            high: 0.80,
            medium: 0.60,
        }
    }
}

impl ConfidencePolicy {
    pub fn new(high: f64, medium: f64) -> Result<Self> {
        let policy = Self { high, medium };
        policy.validate().map_err(RiskError::Validation)?;
        Ok(policy)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.medium > 0.5 && self.medium < self.high && self.high <= 1.0) {
            return Err(format!(
                "confidence thresholds must satisfy 0.5 < medium < high <= 1, got medium={} high={}",
                self.medium, self.high
            ));
        }
        Ok(())
    }

    pub fn band(&self, p: f64) -> Confidence {
        if p >= self.high || p <= mirror(self.high) {
            Confidence::High
        } else if p >= self.medium || p <= mirror(self.medium) {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// `1 - t` without the representation error, so 0.8 mirrors to exactly 0.2.
fn mirror(t: f64) -> f64 {
    ((1.0 - t) * 1e12).round() / 1e12
}

#[derive(Debug, Clone, Default)]
pub struct PredictionAssembler {
    policy: ConfidencePolicy,
}

impl PredictionAssembler {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    pub fn assemble(
        &self,
        classifier: &dyn RiskClassifier,
        vector: &NormalizedFeatureVector,
    ) -> Result<RiskPrediction> {
        if vector.len() != classifier.input_dim() {
            let msg = format!(
                "normalized vector has {} columns, classifier expects {}",
                vector.len(),
                classifier.input_dim()
            );
            error!(%msg, "feature contract mismatch");
            return Err(RiskError::Inference(msg));
        }

        let output = classifier.predict(vector.values()).map_err(|e| match e {
            RiskError::Inference(_) => e,
            other => RiskError::Inference(other.to_string()),
        })?;
        output.check()?;

        Ok(RiskPrediction {
            risk_class: output.class,
            risk_probability: output.probability,
            risk_level: RiskLevel::from_class(output.class),
            confidence: self.policy.band(output.probability),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskFeatures;
    use crate::ml::artifact::PreprocessingSpec;
    use crate::ml::classifier::{ClassifierOutput, MockRiskClassifier};
    use crate::ml::normalizer::FeatureNormalizer;

    fn vector() -> NormalizedFeatureVector {
        let features = RiskFeatures {
            cap_mcm: 120.5,
            cap_max: 150.0,
            cap_min: 20.0,
            area_skm: 15.2,
            area_max: 18.0,
            depth_m: 25.0,
            catch_skm: 850.0,
            dis_avg_ls: 45.0,
            elev_masl: 520.0,
            dam_hgt_m: 38.0,
            dam_len_m: 420.0,
            dam_type: "Бетонная".to_string(),
            instream: "Да".to_string(),
        };
        FeatureNormalizer::new(&PreprocessingSpec::legacy())
            .unwrap()
            .normalize(&features)
            .unwrap()
    }

    fn mock_returning(class: u8, probability: f64) -> MockRiskClassifier {
        let mut mock = MockRiskClassifier::new();
        mock.expect_input_dim().return_const(17usize);
        mock.expect_predict()
            .withf(|v| v.len() == 17)
            .times(1)
            .returning(move |_| Ok(ClassifierOutput { class, probability }));
        mock
    }

    #[test]
    fn high_risk_high_confidence() {
        let clf = mock_returning(1, 0.89);
        let p = PredictionAssembler::default().assemble(&clf, &vector()).unwrap();
        assert_eq!(p.risk_class, 1);
        assert_eq!(p.risk_level, RiskLevel::High);
        assert_eq!(p.risk_probability, 0.89);
        assert_eq!(p.confidence, Confidence::High);
    }

    #[test]
    fn low_risk_mapping() {
        let clf = mock_returning(0, 0.35);
        let p = PredictionAssembler::default().assemble(&clf, &vector()).unwrap();
        assert_eq!(p.risk_level, RiskLevel::Low);
        assert_eq!(p.confidence, Confidence::Medium);
    }

    #[test]
    fn banding_covers_unit_interval_without_gaps() {
        let policy = ConfidencePolicy::default();
        assert_eq!(policy.band(0.0), Confidence::High);
        assert_eq!(policy.band(0.2), Confidence::High);
        assert_eq!(policy.band(0.2001), Confidence::Medium);
        assert_eq!(policy.band(0.4), Confidence::Medium);
        assert_eq!(policy.band(0.4001), Confidence::Low);
        assert_eq!(policy.band(0.5), Confidence::Low);
        assert_eq!(policy.band(0.5999), Confidence::Low);
        assert_eq!(policy.band(0.6), Confidence::Medium);
        assert_eq!(policy.band(0.7999), Confidence::Medium);
        assert_eq!(policy.band(0.8), Confidence::High);
        assert_eq!(policy.band(1.0), Confidence::High);

        for p in [0.05, 0.3, 0.45, 0.55, 0.7, 0.95] {
            assert_eq!(policy.band(p), policy.band(1.0 - p));
        }

        // monotonic in distance from the boundary
        let rank = |c: Confidence| match c {
            Confidence::Low => 0,
            Confidence::Medium => 1,
            Confidence::High => 2,
        };
        let mut last = 0;
        for i in 0..=500 {
            let p = 0.5 + f64::from(i) / 1000.0;
            let r = rank(policy.band(p));
            assert!(r >= last, "band regressed at p={p}");
            last = r;
        }
    }

    #[test]
    fn policy_rejects_inverted_thresholds() {
        assert!(ConfidencePolicy::new(0.6, 0.8).is_err());
        assert!(ConfidencePolicy::new(1.1, 0.6).is_err());
        assert!(ConfidencePolicy::new(0.8, 0.5).is_err());
        assert!(ConfidencePolicy::new(0.75, 0.65).is_ok());
    }

    #[test]
    fn oracle_failure_becomes_inference_error() {
        let mut clf = MockRiskClassifier::new();
        clf.expect_input_dim().return_const(17usize);
        clf.expect_predict()
            .returning(|_| Err(RiskError::Internal("tensor shape".into())));
        let err = PredictionAssembler::default()
            .assemble(&clf, &vector())
            .unwrap_err();
        assert!(matches!(err, RiskError::Inference(_)));
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let clf = mock_returning(1, 1.5);
        let err = PredictionAssembler::default()
            .assemble(&clf, &vector())
            .unwrap_err();
        assert!(matches!(err, RiskError::Inference(_)));
    }

    #[test]
    fn shape_mismatch_never_reaches_oracle() {
        let mut clf = MockRiskClassifier::new();
        clf.expect_input_dim().return_const(5usize);
        clf.expect_predict().never();
        let err = PredictionAssembler::default()
            .assemble(&clf, &vector())
            .unwrap_err();
        assert!(matches!(err, RiskError::Inference(_)));
    }
}
