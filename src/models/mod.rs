// checkLit Data Models
// Result records exposed at the serialization boundary. Field names are stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ============ Stylometry ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NgramCount {
    pub ngram: String,
    pub count: usize,
}

/// Stylometric fingerprint of one text. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FeatureVector {
    /// Moving-average type-token ratio.
    pub ttr: f64,
    pub avg_sentence_length: f64,
    pub sentence_length_std: f64,
    pub lexical_density: f64,
    pub entropy: f64,
    pub entropy_norm: f64,
    /// Hapax legomena over distinct words.
    pub vocab_richness: f64,
    pub word_count: usize,
    pub sentence_count: usize,
    pub unique_words: usize,
    pub mtld: f64,
    pub yules_k: f64,
    pub dialogue_ratio: f64,
    pub top_ngrams: Vec<NgramCount>,
    /// `punct_<name>_per_1kchar` frequencies, serialized next to the other keys.
    #[serde(default, flatten)]
    pub punctuation: BTreeMap<String, f64>,
}

const COMPARABLE_FEATURES: &[&str] = &[
    "ttr",
    "avg_sentence_length",
    "sentence_length_std",
    "lexical_density",
    "entropy",
    "entropy_norm",
    "vocab_richness",
    "mtld",
    "yules_k",
    "dialogue_ratio",
];

impl FeatureVector {
    /// Whether `name` is a scalar metric usable by the similarity engine.
    pub fn is_comparable(name: &str) -> bool {
        COMPARABLE_FEATURES.contains(&name)
    }

    /// Look up a scalar metric by its serialized name.
    pub fn value(&self, name: &str) -> Option<f64> {
        let v = match name {
            "ttr" => self.ttr,
            "avg_sentence_length" => self.avg_sentence_length,
            "sentence_length_std" => self.sentence_length_std,
            "lexical_density" => self.lexical_density,
            "entropy" => self.entropy,
            "entropy_norm" => self.entropy_norm,
            "vocab_richness" => self.vocab_richness,
            "mtld" => self.mtld,
            "yules_k" => self.yules_k,
            "dialogue_ratio" => self.dialogue_ratio,
            _ => return None,
        };
        Some(v)
    }
}

// ============ Readability ============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadabilityLevel {
    VeryEasy,
    Easy,
    Medium,
    Hard,
    VeryHard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityResult {
    pub lix_score: f64,
    pub lix_level: ReadabilityLevel,
    pub lix_label: String,
    pub lix_description: String,
    pub avg_word_length: f64,
    pub punctuation_density: f64,
    pub long_word_ratio: f64,
}

// ============ AI Detection ============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Perplexity,
    Hybrid,
    Heuristic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::Medium => "Medium",
            Confidence::High => "High",
        }
    }
}

pub const LABEL_AI: &str = "AI-generated";
pub const LABEL_HUMAN: &str = "Human-written";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub ai_probability: f64,
    pub human_probability: f64,
    pub label: String,
    pub confidence: Confidence,
    /// `None` when the language model was unavailable.
    pub perplexity: Option<f64>,
    pub method: DetectionMethod,
    pub in_gray_zone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylometric_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indicators: Vec<String>,
}

impl DetectionResult {
    pub fn is_heuristic(&self) -> bool {
        self.method == DetectionMethod::Heuristic
    }
}

// ============ Similarity ============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityResult {
    pub similarity_score: f64,
    /// Raw weighted euclidean distance, for diagnostics.
    pub distance: f64,
    pub level: SimilarityLevel,
    /// Absolute normalized difference per metric; 0 means identical.
    pub breakdown: BTreeMap<String, f64>,
}

// ============ Reports ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text_preview: String,
    pub text_length: usize,
    pub ai_detection: DetectionResult,
    pub stylometry: FeatureVector,
    pub quality: QualityResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub text_a: FeatureVector,
    pub text_b: FeatureVector,
    pub similarity: SimilarityResult,
}
