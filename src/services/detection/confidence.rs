// Confidence labelling
// Confidence reflects distance from even odds, never the raw probability.

use crate::models::Confidence;
use crate::services::config_store::ConfidenceConfig;

/// Label how decisive `ai_probability` is. Gray-zone results are always Low.
pub fn confidence_for(ai_probability: f64, in_gray_zone: bool, cfg: &ConfidenceConfig) -> Confidence {
    if in_gray_zone {
        return Confidence::Low;
    }
    let decisiveness = ai_probability.max(1.0 - ai_probability);
    if decisiveness >= cfg.high {
        Confidence::High
    } else if decisiveness >= cfg.medium {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
