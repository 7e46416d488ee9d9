// AI-likelihood estimator
// Combines calibrated perplexity, the optional stylometric corrector and the
// heuristic fallback into one detection outcome.

use crate::models::{
    Confidence, DetectionMethod, DetectionResult, FeatureVector, LABEL_AI, LABEL_HUMAN,
};
use crate::services::config_store::{CalibrationConfig, ConfidenceConfig, ConfigError, HybridConfig};
use crate::services::round_to;
use tracing::debug;

use super::calibration::PerplexityCalibration;
use super::confidence::confidence_for;
use super::fallback::{heuristic_estimate, HEURISTIC_NOTE};
use super::stylometric::{blend, hybrid_applicable, stylometric_ai_score};

/// Outcome of one estimate. Heuristic results carry no perplexity and no
/// confidence of their own, so they cannot be mistaken for model-backed ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    ModelBacked {
        perplexity: f64,
        ai_probability: f64,
        in_gray_zone: bool,
        confidence: Confidence,
        confidence_note: Option<String>,
        stylometric_score: Option<f64>,
    },
    Heuristic {
        ai_probability: f64,
        indicators: Vec<String>,
    },
}

impl Detection {
    pub fn ai_probability(&self) -> f64 {
        match self {
            Detection::ModelBacked { ai_probability, .. } => *ai_probability,
            Detection::Heuristic { ai_probability, .. } => *ai_probability,
        }
    }

    pub fn is_heuristic(&self) -> bool {
        matches!(self, Detection::Heuristic { .. })
    }
}

fn label_for(ai_probability: f64) -> &'static str {
    if ai_probability > 0.5 {
        LABEL_AI
    } else {
        LABEL_HUMAN
    }
}

impl From<Detection> for DetectionResult {
    fn from(detection: Detection) -> Self {
        let ai = round_to(detection.ai_probability(), 4);
        let mut result = DetectionResult {
            ai_probability: ai,
            human_probability: round_to(1.0 - ai, 4),
            label: label_for(ai).to_string(),
            confidence: Confidence::Low,
            perplexity: None,
            method: DetectionMethod::Heuristic,
            in_gray_zone: false,
            confidence_note: None,
            stylometric_score: None,
            indicators: Vec::new(),
        };
        match detection {
            Detection::ModelBacked {
                perplexity,
                in_gray_zone,
                confidence,
                confidence_note,
                stylometric_score,
                ..
            } => {
                result.method = if stylometric_score.is_some() {
                    DetectionMethod::Hybrid
                } else {
                    DetectionMethod::Perplexity
                };
                result.confidence = confidence;
                result.perplexity = Some(perplexity);
                result.in_gray_zone = in_gray_zone;
                result.confidence_note = confidence_note;
                result.stylometric_score = stylometric_score.map(|s| round_to(s, 4));
            }
            Detection::Heuristic { indicators, .. } => {
                result.confidence_note = Some(HEURISTIC_NOTE.to_string());
                result.indicators = indicators;
            }
        }
        result
    }
}

/// Stateless between calls; holds only the validated calibration.
#[derive(Debug, Clone)]
pub struct AiLikelihoodEstimator {
    calibration: PerplexityCalibration,
    hybrid: HybridConfig,
    confidence: ConfidenceConfig,
}

impl AiLikelihoodEstimator {
    pub fn new(cfg: &CalibrationConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            calibration: PerplexityCalibration::from_config(cfg),
            hybrid: cfg.hybrid.clone(),
            confidence: cfg.confidence.clone(),
        })
    }

    /// Classify from an optional perplexity. `None`, or a value that is not a
    /// positive finite number, selects the heuristic fallback.
    pub fn detect(
        &self,
        perplexity: Option<f64>,
        features: Option<&FeatureVector>,
        text: &str,
    ) -> Detection {
        let ppx = match perplexity {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => {
                let est = heuristic_estimate(text, features);
                debug!(
                    ai_probability = est.ai_probability,
                    indicators = est.indicators.len(),
                    "detection.heuristic"
                );
                return Detection::Heuristic {
                    ai_probability: est.ai_probability,
                    indicators: est.indicators,
                };
            }
        };

        let ppx_probability = self.calibration.probability_ai(ppx);
        let stylometric_score = features
            .filter(|fv| hybrid_applicable(fv, &self.hybrid))
            .map(|fv| stylometric_ai_score(fv, &self.hybrid));

        let ai_probability = match stylometric_score {
            Some(s) => blend(ppx_probability, s, self.hybrid.perplexity_weight),
            None => ppx_probability,
        };

        let in_gray_zone = self.calibration.in_gray_zone(ppx);
        let confidence = confidence_for(ai_probability, in_gray_zone, &self.confidence);
        let confidence_note = in_gray_zone.then(|| self.calibration.gray_zone_note());

        debug!(
            perplexity = ppx,
            ppx_probability,
            ai_probability,
            in_gray_zone,
            "detection.model_backed"
        );

        Detection::ModelBacked {
            perplexity: ppx,
            ai_probability,
            in_gray_zone,
            confidence,
            confidence_note,
            stylometric_score,
        }
    }

    /// Same as [`detect`](Self::detect), flattened into the serializable record.
    pub fn estimate(
        &self,
        perplexity: Option<f64>,
        features: Option<&FeatureVector>,
        text: &str,
    ) -> DetectionResult {
        self.detect(perplexity, features, text).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> AiLikelihoodEstimator {
        AiLikelihoodEstimator::new(&CalibrationConfig::default()).unwrap()
    }

    fn hybrid_features(word_count: usize) -> FeatureVector {
        // every corrector signal at its AI-typical end
        FeatureVector {
            ttr: 0.60,
            entropy: 5.5,
            vocab_richness: 0.55,
            word_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_probability_monotone_in_perplexity() {
        let est = estimator();
        let mut prev = 1.0;
        for ppx in (1..=200).map(|i| i as f64) {
            let r = est.estimate(Some(ppx), None, "");
            assert!(r.ai_probability <= prev, "not monotone at {}", ppx);
            prev = r.ai_probability;
        }
    }

    #[test]
    fn test_midpoint_is_half() {
        let est = estimator();
        let r = est.estimate(Some(37.043), None, "");
        assert!((r.ai_probability - 0.5).abs() < 1e-3);
        assert_eq!(r.label, LABEL_HUMAN);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let est = estimator();
        let fv = hybrid_features(120);
        for ppx in [None, Some(5.0), Some(32.0), Some(37.5), Some(41.1), Some(250.0)] {
            for features in [None, Some(&fv)] {
                let r = est.estimate(ppx, features, "Ponadto tekst.");
                assert!((r.ai_probability + r.human_probability - 1.0).abs() <= 1e-3);
            }
        }
    }

    #[test]
    fn test_clear_cases_are_confident() {
        let est = estimator();
        let ai = est.estimate(Some(12.0), None, "");
        assert_eq!(ai.label, LABEL_AI);
        assert_eq!(ai.confidence, Confidence::High);
        assert_eq!(ai.method, DetectionMethod::Perplexity);
        assert_eq!(ai.perplexity, Some(12.0));

        let human = est.estimate(Some(90.0), None, "");
        assert_eq!(human.label, LABEL_HUMAN);
        assert_eq!(human.confidence, Confidence::High);
    }

    #[test]
    fn test_gray_zone_reduces_confidence() {
        let est = estimator();
        let r = est.estimate(Some(33.0), None, "");
        assert!(r.in_gray_zone);
        assert_eq!(r.confidence, Confidence::Low);
        assert!(r.confidence_note.is_some());
    }

    #[test]
    fn test_hybrid_blend_applies_with_enough_words() {
        let est = estimator();
        let fv = hybrid_features(120);
        let r = est.estimate(Some(37.043), Some(&fv), "");
        assert_eq!(r.method, DetectionMethod::Hybrid);
        assert_eq!(r.stylometric_score, Some(1.0));
        assert!((r.ai_probability - 0.65).abs() < 1e-3);
    }

    #[test]
    fn test_hybrid_skipped_for_short_or_disabled() {
        let fv = hybrid_features(10);
        let r = estimator().estimate(Some(20.0), Some(&fv), "");
        assert_eq!(r.method, DetectionMethod::Perplexity);
        assert!(r.stylometric_score.is_none());

        let mut cfg = CalibrationConfig::default();
        cfg.hybrid.enabled = false;
        let est = AiLikelihoodEstimator::new(&cfg).unwrap();
        let r = est.estimate(Some(20.0), Some(&hybrid_features(500)), "");
        assert_eq!(r.method, DetectionMethod::Perplexity);
    }

    #[test]
    fn test_missing_perplexity_is_marked_heuristic() {
        let est = estimator();
        let detection = est.detect(None, None, "Reasumując, wszystko jest jasne.");
        assert!(detection.is_heuristic());

        let r: DetectionResult = detection.into();
        assert!(r.is_heuristic());
        assert_eq!(r.confidence, Confidence::Low);
        assert!(r.perplexity.is_none());
        assert_eq!(r.confidence_note.as_deref(), Some(HEURISTIC_NOTE));
        assert_eq!(r.indicators, vec!["reasumując".to_string()]);
        assert!(r.ai_probability >= 0.1 && r.ai_probability <= 0.9);
    }

    #[test]
    fn test_record_rounds_the_detection_probability() {
        let detection = estimator().detect(Some(30.0), None, "");
        let raw = detection.ai_probability();
        let r: DetectionResult = detection.into();
        assert_eq!(r.ai_probability, round_to(raw, 4));
        assert_eq!(r.human_probability, round_to(1.0 - r.ai_probability, 4));
        assert!(r.indicators.is_empty());
    }

    #[test]
    fn test_invalid_perplexity_falls_back() {
        let est = estimator();
        assert!(est.detect(Some(f64::NAN), None, "").is_heuristic());
        assert!(est.detect(Some(-3.0), None, "").is_heuristic());
    }

    #[test]
    fn test_invalid_calibration_rejected() {
        let mut cfg = CalibrationConfig::default();
        cfg.human_threshold = 10.0;
        assert!(AiLikelihoodEstimator::new(&cfg).is_err());
    }
}
