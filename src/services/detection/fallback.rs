// Heuristic fallback
// Used only when no perplexity is available. Keyword indicators and
// sentence-length uniformity; results are always low-confidence.

use crate::models::FeatureVector;

/// Connective phrases over-represented in generated essays.
pub const AI_INDICATORS: &[&str] = &[
    "ponadto",
    "należy zauważyć",
    "warto podkreślić",
    "w podsumowaniu",
    "reasumując",
    "additionally",
    "furthermore",
    "in conclusion",
];

const BASE_PROBABILITY: f64 = 0.5;
const INDICATOR_WEIGHT: f64 = 0.1;
/// Coefficient of variation of sentence length typical for human prose.
const HUMAN_TYPICAL_CV: f64 = 0.45;
const UNIFORMITY_GAIN: f64 = 0.4;
const MAX_UNIFORMITY_SHIFT: f64 = 0.15;
const MIN_SENTENCES: usize = 3;
const PROBABILITY_FLOOR: f64 = 0.10;
const PROBABILITY_CEIL: f64 = 0.90;

pub const HEURISTIC_NOTE: &str = "heuristic mode – model unavailable";

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicEstimate {
    pub ai_probability: f64,
    pub indicators: Vec<String>,
}

pub fn find_indicators(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    AI_INDICATORS
        .iter()
        .filter(|phrase| lowered.contains(*phrase))
        .map(|phrase| phrase.to_string())
        .collect()
}

/// Shift towards AI when sentence lengths are unusually uniform, towards
/// human when they vary a lot. 0 with fewer than three sentences.
pub fn uniformity_adjustment(features: &FeatureVector) -> f64 {
    if features.sentence_count < MIN_SENTENCES || features.avg_sentence_length <= 0.0 {
        return 0.0;
    }
    let cv = features.sentence_length_std / features.avg_sentence_length;
    ((HUMAN_TYPICAL_CV - cv) * UNIFORMITY_GAIN).clamp(-MAX_UNIFORMITY_SHIFT, MAX_UNIFORMITY_SHIFT)
}

pub fn heuristic_estimate(text: &str, features: Option<&FeatureVector>) -> HeuristicEstimate {
    let indicators = find_indicators(text);
    let mut p = BASE_PROBABILITY + INDICATOR_WEIGHT * indicators.len() as f64;
    if let Some(fv) = features {
        p += uniformity_adjustment(fv);
    }
    HeuristicEstimate {
        ai_probability: p.clamp(PROBABILITY_FLOOR, PROBABILITY_CEIL),
        indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence_stats(count: usize, avg: f64, std: f64) -> FeatureVector {
        FeatureVector {
            sentence_count: count,
            avg_sentence_length: avg,
            sentence_length_std: std,
            ..Default::default()
        }
    }

    #[test]
    fn test_neutral_text_stays_at_base() {
        let est = heuristic_estimate("Kot siedział na płocie.", None);
        assert_eq!(est.ai_probability, 0.5);
        assert!(est.indicators.is_empty());
    }

    #[test]
    fn test_indicators_raise_probability() {
        let text = "Ponadto należy zauważyć, że temat jest ważny. W podsumowaniu: tak.";
        let est = heuristic_estimate(text, None);
        assert_eq!(est.indicators.len(), 3);
        assert!((est.ai_probability - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_probability_is_clamped() {
        let text = AI_INDICATORS.join(". ");
        let est = heuristic_estimate(&text, None);
        assert_eq!(est.ai_probability, 0.9);
    }

    #[test]
    fn test_uniform_sentences_lean_ai() {
        assert_eq!(uniformity_adjustment(&sentence_stats(5, 15.0, 1.0)), 0.15);
        assert_eq!(uniformity_adjustment(&sentence_stats(5, 15.0, 20.0)), -0.15);
        assert_eq!(uniformity_adjustment(&sentence_stats(2, 15.0, 1.0)), 0.0);
        let est = heuristic_estimate("Zwykły tekst.", Some(&sentence_stats(5, 15.0, 1.0)));
        assert!((est.ai_probability - 0.65).abs() < 1e-12);
    }
}
