// Similarity Engine
// Weighted euclidean similarity between two stylometric fingerprints

use crate::models::{FeatureVector, SimilarityLevel, SimilarityResult};
use crate::services::config_store::{ConfigError, FeatureRange, SimilarityConfig};
use crate::services::round_to;
use std::collections::BTreeMap;

impl SimilarityLevel {
    pub fn from_score(score: f64, low_threshold: f64, high_threshold: f64) -> Self {
        if score < low_threshold {
            SimilarityLevel::Low
        } else if score >= high_threshold {
            SimilarityLevel::High
        } else {
            SimilarityLevel::Medium
        }
    }
}

fn normalize(value: f64, range: &FeatureRange) -> f64 {
    ((value - range.lo) / (range.hi - range.lo)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    features: Vec<FeatureRange>,
    weight_norm: f64,
    low_threshold: f64,
    high_threshold: f64,
}

impl SimilarityEngine {
    pub fn new(cfg: &SimilarityConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let weight_norm = cfg.features.iter().map(|f| f.weight * f.weight).sum::<f64>().sqrt();
        Ok(Self {
            features: cfg.features.clone(),
            weight_norm,
            low_threshold: cfg.low_threshold,
            high_threshold: cfg.high_threshold,
        })
    }

    /// Similarity in [0, 1]; 1 means identical on every compared metric.
    ///
    /// Each metric is normalized against its fixed range, the absolute
    /// difference is weighted, and the weighted distance is scaled by the
    /// norm of the weights.
    pub fn compare(&self, a: &FeatureVector, b: &FeatureVector) -> SimilarityResult {
        let mut breakdown = BTreeMap::new();
        let mut sum_sq = 0.0;

        for range in &self.features {
            let va = a.value(&range.name).unwrap_or(0.0);
            let vb = b.value(&range.name).unwrap_or(0.0);
            let diff = (normalize(va, range) - normalize(vb, range)).abs();
            let weighted = range.weight * diff;
            sum_sq += weighted * weighted;
            breakdown.insert(range.name.clone(), round_to(diff, 4));
        }

        let distance = sum_sq.sqrt();
        let score = if self.weight_norm > 0.0 {
            (1.0 - distance / self.weight_norm).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let score = round_to(score, 4);

        SimilarityResult {
            similarity_score: score,
            distance: round_to(distance, 4),
            level: SimilarityLevel::from_score(score, self.low_threshold, self.high_threshold),
            breakdown,
        }
    }
}
