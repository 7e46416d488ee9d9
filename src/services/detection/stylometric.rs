// Stylometric corrector
// Turns lexical diversity features into an AI-typicality score in [0, 1]
// and blends it with the perplexity probability.

use crate::models::FeatureVector;
use crate::services::config_store::{HybridConfig, SignalRange};

fn normalize(value: f64, range: SignalRange) -> f64 {
    ((value - range.lo) / (range.hi - range.lo)).clamp(0.0, 1.0)
}

/// Mean of three signals where 1 is AI-typical: low diversity, low
/// entropy and few hapaxes.
pub fn stylometric_ai_score(features: &FeatureVector, cfg: &HybridConfig) -> f64 {
    let signals = [
        1.0 - normalize(features.ttr, cfg.ttr),
        1.0 - normalize(features.entropy, cfg.entropy),
        1.0 - normalize(features.vocab_richness, cfg.vocab_richness),
    ];
    signals.iter().sum::<f64>() / signals.len() as f64
}

/// Whether the features carry enough tokens to be blended.
pub fn hybrid_applicable(features: &FeatureVector, cfg: &HybridConfig) -> bool {
    cfg.enabled && features.word_count >= cfg.min_words
}

pub fn blend(perplexity_probability: f64, stylometric_score: f64, perplexity_weight: f64) -> f64 {
    let blended =
        perplexity_weight * perplexity_probability + (1.0 - perplexity_weight) * stylometric_score;
    blended.clamp(0.0, 1.0)
}
