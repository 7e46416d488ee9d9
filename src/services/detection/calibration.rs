// Perplexity calibration
// Logistic mapping from perplexity to P(ai) plus the overlap band where
// human and machine corpora are indistinguishable.

use crate::services::config_store::CalibrationConfig;

/// Logistic with a falling edge: x below `center` maps above 0.5.
#[inline]
fn sigmoid_desc(x: f64, center: f64, k: f64) -> f64 {
    1.0 / (1.0 + (k * (x - center)).exp())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerplexityCalibration {
    pub ai_threshold: f64,
    pub human_threshold: f64,
    pub midpoint: f64,
    pub steepness: f64,
}

impl PerplexityCalibration {
    pub fn from_config(cfg: &CalibrationConfig) -> Self {
        Self {
            ai_threshold: cfg.ai_threshold,
            human_threshold: cfg.human_threshold,
            midpoint: cfg.midpoint,
            steepness: cfg.steepness,
        }
    }

    /// P(ai) for a perplexity value. Lower perplexity means more machine-like.
    pub fn probability_ai(&self, perplexity: f64) -> f64 {
        sigmoid_desc(perplexity, self.midpoint, self.steepness)
    }

    /// Strictly between the two thresholds.
    pub fn in_gray_zone(&self, perplexity: f64) -> bool {
        perplexity > self.ai_threshold && perplexity < self.human_threshold
    }

    pub fn gray_zone_note(&self) -> String {
        format!(
            "perplexity in overlap zone ({:.2}-{:.2}), human and AI texts overlap here; confidence reduced",
            self.ai_threshold, self.human_threshold
        )
    }
}

impl Default for PerplexityCalibration {
    fn default() -> Self {
        Self::from_config(&CalibrationConfig::default())
    }
}
