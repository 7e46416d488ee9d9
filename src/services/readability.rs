// Readability Service
// LIX readability index and surface-level quality metrics

use crate::models::{QualityResult, ReadabilityLevel};
use crate::services::config_store::StylometryConfig;
use crate::services::round_to;
use crate::services::sentence_segmenter::{segment_sentences, Sentence};
use crate::services::text_processor::{normalize_text, tokenize_words, Token};

/// Words longer than this many characters count as long.
const LONG_WORD_CHARS: usize = 6;

impl ReadabilityLevel {
    pub fn from_lix(score: f64) -> Self {
        if score < 25.0 {
            ReadabilityLevel::VeryEasy
        } else if score < 35.0 {
            ReadabilityLevel::Easy
        } else if score < 45.0 {
            ReadabilityLevel::Medium
        } else if score < 55.0 {
            ReadabilityLevel::Hard
        } else {
            ReadabilityLevel::VeryHard
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadabilityLevel::VeryEasy => "Bardzo łatwy",
            ReadabilityLevel::Easy => "Łatwy",
            ReadabilityLevel::Medium => "Średni",
            ReadabilityLevel::Hard => "Trudny",
            ReadabilityLevel::VeryHard => "Bardzo trudny",
        }
    }

    /// Typical literary genre for the bracket.
    pub fn description(&self) -> &'static str {
        match self {
            ReadabilityLevel::VeryEasy => "Literatura dziecięca, bajki",
            ReadabilityLevel::Easy => "Proza popularna, literatura młodzieżowa",
            ReadabilityLevel::Medium => "Beletrystyka, proza współczesna",
            ReadabilityLevel::Hard => "Literatura poważna, proza złożona",
            ReadabilityLevel::VeryHard => "Proza awangardowa, teksty naukowe",
        }
    }
}

fn is_long(token: &str) -> bool {
    token.chars().count() > LONG_WORD_CHARS
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '—' | '–' | '„' | '”' | '“' | '’' | '…' | '«' | '»')
}

/// LIX = words / sentences + 100 * long_words / words. 0 when either count is 0.
pub fn lix_score(tokens: &[Token], sentence_count: usize) -> f64 {
    if tokens.is_empty() || sentence_count == 0 {
        return 0.0;
    }
    let words = tokens.len() as f64;
    let long = tokens.iter().filter(|t| is_long(t)).count() as f64;
    words / sentence_count as f64 + 100.0 * long / words
}

pub fn avg_word_length(tokens: &[Token]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
    chars as f64 / tokens.len() as f64
}

pub fn long_word_ratio(tokens: &[Token]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    tokens.iter().filter(|t| is_long(t)).count() as f64 / tokens.len() as f64
}

/// Punctuation marks over all non-whitespace characters.
pub fn punctuation_density(text: &str) -> f64 {
    let mut visible = 0usize;
    let mut punct = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        visible += 1;
        if is_punctuation(c) {
            punct += 1;
        }
    }
    if visible == 0 {
        return 0.0;
    }
    punct as f64 / visible as f64
}

/// Quality metrics from already computed tokens and sentences.
pub fn assess_quality(text: &str, tokens: &[Token], sentences: &[Sentence]) -> QualityResult {
    let lix = round_to(lix_score(tokens, sentences.len()), 2);
    let level = ReadabilityLevel::from_lix(lix);
    QualityResult {
        lix_score: lix,
        lix_level: level,
        lix_label: level.label().to_string(),
        lix_description: level.description().to_string(),
        avg_word_length: round_to(avg_word_length(tokens), 2),
        punctuation_density: round_to(punctuation_density(text), 4),
        long_word_ratio: round_to(long_word_ratio(tokens), 4),
    }
}

/// Tokenize and segment `text`, then score it.
pub fn analyze_quality(text: &str, cfg: &StylometryConfig) -> QualityResult {
    let normalized = normalize_text(text);
    let tokens = tokenize_words(&normalized);
    let sentences = segment_sentences(&normalized, cfg);
    assess_quality(&normalized, &tokens, &sentences)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(text: &str) -> QualityResult {
        analyze_quality(text, &StylometryConfig::default())
    }

    #[test]
    fn test_short_words_are_very_easy() {
        let q = quality("Ala ma kota. Kot ma Alę.");
        assert_eq!(q.lix_score, 3.0);
        assert_eq!(q.lix_level, ReadabilityLevel::VeryEasy);
        assert_eq!(q.lix_label, "Bardzo łatwy");
        assert_eq!(q.long_word_ratio, 0.0);
    }

    #[test]
    fn test_long_words_are_very_hard() {
        let q = quality("Nieprawdopodobnie skomplikowane wyrażenie.");
        assert_eq!(q.lix_score, 103.0);
        assert_eq!(q.lix_level, ReadabilityLevel::VeryHard);
        assert_eq!(q.lix_description, "Proza awangardowa, teksty naukowe");
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(ReadabilityLevel::from_lix(24.99), ReadabilityLevel::VeryEasy);
        assert_eq!(ReadabilityLevel::from_lix(25.0), ReadabilityLevel::Easy);
        assert_eq!(ReadabilityLevel::from_lix(35.0), ReadabilityLevel::Medium);
        assert_eq!(ReadabilityLevel::from_lix(45.0), ReadabilityLevel::Hard);
        assert_eq!(ReadabilityLevel::from_lix(55.0), ReadabilityLevel::VeryHard);
    }

    #[test]
    fn test_word_length_counts_characters_not_bytes() {
        let q = quality("Zażółć gęśląjaźń.");
        assert_eq!(q.long_word_ratio, 0.5);
        assert_eq!(q.avg_word_length, 7.5);
    }

    #[test]
    fn test_punctuation_density() {
        assert_eq!(punctuation_density("Ala, kot."), 0.25);
        assert_eq!(punctuation_density("— Tak"), 0.25);
        assert_eq!(punctuation_density("   "), 0.0);
    }

    #[test]
    fn test_empty_text() {
        let q = quality("");
        assert_eq!(q.lix_score, 0.0);
        assert_eq!(q.avg_word_length, 0.0);
        assert_eq!(q.punctuation_density, 0.0);
    }
}
