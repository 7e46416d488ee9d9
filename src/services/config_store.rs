// Configuration Storage Service
// Analysis configuration, validation, and config file read/write with version backup

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

// ============ Top-level Config ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub stylometry: StylometryConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub limits: InputLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            stylometry: StylometryConfig::default(),
            calibration: CalibrationConfig::default(),
            similarity: SimilarityConfig::default(),
            model: ModelConfig::default(),
            limits: InputLimits::default(),
        }
    }
}

impl AppConfig {
    /// Reject contradictory or degenerate values before any component is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stylometry.validate()?;
        self.calibration.validate()?;
        self.similarity.validate()?;
        self.model.validate()?;
        self.limits.validate()?;
        Ok(())
    }
}

// ============ Stylometry ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NgramConfig {
    pub n: usize,
    pub top_k: usize,
    pub min_count: usize,
}

impl Default for NgramConfig {
    fn default() -> Self {
        Self {
            n: 2,
            top_k: 5,
            min_count: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylometryConfig {
    #[serde(default = "default_mattr_window")]
    pub mattr_window: usize,
    /// Above this many words per punctuated sentence the text is treated as verse.
    #[serde(default = "default_verse_ratio")]
    pub verse_word_sentence_ratio: f64,
    #[serde(default = "default_min_line_len")]
    pub min_line_len_for_verse: usize,
    #[serde(default = "default_mtld_threshold")]
    pub mtld_threshold: f64,
    #[serde(default)]
    pub ngram: NgramConfig,
    #[serde(default = "default_abbreviations")]
    pub abbreviations: HashSet<String>,
    #[serde(default = "default_stopwords")]
    pub stopwords: HashSet<String>,
}

impl Default for StylometryConfig {
    fn default() -> Self {
        Self {
            mattr_window: default_mattr_window(),
            verse_word_sentence_ratio: default_verse_ratio(),
            min_line_len_for_verse: default_min_line_len(),
            mtld_threshold: default_mtld_threshold(),
            ngram: NgramConfig::default(),
            abbreviations: default_abbreviations(),
            stopwords: default_stopwords(),
        }
    }
}

impl StylometryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mattr_window == 0 {
            return Err(invalid("stylometry.mattr_window must be > 0"));
        }
        if !(self.verse_word_sentence_ratio > 0.0) {
            return Err(invalid("stylometry.verse_word_sentence_ratio must be > 0"));
        }
        if !(self.mtld_threshold > 0.0 && self.mtld_threshold < 1.0) {
            return Err(invalid("stylometry.mtld_threshold must be in (0, 1)"));
        }
        if self.ngram.n == 0 || self.ngram.top_k == 0 {
            return Err(invalid("stylometry.ngram n and top_k must be > 0"));
        }
        Ok(())
    }
}

/// Titles, units, and other dotted abbreviations common in Polish prose.
pub const DEFAULT_ABBREVIATIONS_PL: &[&str] = &[
    "dr", "prof", "mgr", "inż", "hab", "itd", "itp", "np", "m.in", "tj", "tzn", "św", "al", "ul",
    "pl", "nr", "str", "s", "rozdz", "red", "wyd", "dz", "p", "godz", "rys", "tab", "pkt", "ust",
    "art", "zob", "ks", "gen", "płk", "kpt", "ppor", "por", "ok", "wg", "tzw", "jw", "cdn", "br",
    "zł", "gr", "kg", "km", "cm", "mm", "min", "sek", "tys", "mln", "mld", "r", "w", "ww",
];

/// Pragmatic function-word filter: conjunctions, prepositions, pronouns,
/// auxiliary verb forms and particles.
pub const DEFAULT_STOPWORDS_PL: &[&str] = &[
    "i", "a", "ale", "lub", "albo", "lecz", "że", "z", "za", "do", "od", "u", "o", "w", "we", "na",
    "nad", "pod", "przed", "przez", "po", "bez", "dla", "jak", "gdy", "kiedy", "bo", "więc", "czy",
    "żeby", "aby", "choć", "chociaż", "ponieważ", "dlatego", "to", "tego", "temu", "tę", "ta",
    "ten", "te", "ci", "tam", "tu", "tutaj", "stąd", "stamtąd", "tak", "nie", "już", "jeszcze",
    "bardzo", "trochę", "wiele", "mało", "więcej", "mniej", "aż", "tylko", "również", "też",
    "nawet", "ja", "ty", "on", "ona", "ono", "my", "wy", "oni", "one", "mnie", "mi", "mną",
    "ciebie", "tobie", "tobą", "go", "jego", "jemu", "nim", "nią", "jej", "jejże", "im", "nimi",
    "ich", "nas", "nam", "nami", "was", "wam", "wami", "się", "sobie", "siebie", "swoje", "swój",
    "swoja", "swoją", "swoim", "swojej", "jest", "są", "był", "była", "było", "byli", "były",
    "będzie", "będą", "być", "bywa", "został", "została", "zostało", "zostać", "mam", "masz", "ma",
    "mamy", "macie", "mają", "miał", "miała", "miało", "mieć", "niech", "niechże", "oto",
    "właśnie", "ze", "ku", "przy", "między", "co", "kto", "który", "która", "które", "którego",
    "której", "gdzie", "by", "mu",
];

fn default_version() -> String { "1.0.0".to_string() }
fn default_mattr_window() -> usize { 50 }
fn default_verse_ratio() -> f64 { 40.0 }
fn default_min_line_len() -> usize { 5 }
fn default_mtld_threshold() -> f64 { 0.72 }
fn default_abbreviations() -> HashSet<String> {
    DEFAULT_ABBREVIATIONS_PL.iter().map(|s| s.to_string()).collect()
}
fn default_stopwords() -> HashSet<String> {
    DEFAULT_STOPWORDS_PL.iter().map(|s| s.to_string()).collect()
}

// ============ Calibration ============

/// Normalization bounds for one stylometric corrector signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SignalRange {
    pub lo: f64,
    pub hi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub enabled: bool,
    /// Share of the final probability taken from perplexity; the rest comes from stylometry.
    pub perplexity_weight: f64,
    pub ttr: SignalRange,
    pub entropy: SignalRange,
    pub vocab_richness: SignalRange,
    /// Below this many tokens the stylometric signals are too noisy to blend.
    pub min_words: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            perplexity_weight: 0.7,
            ttr: SignalRange { lo: 0.60, hi: 0.85 },
            entropy: SignalRange { lo: 5.5, hi: 8.0 },
            vocab_richness: SignalRange { lo: 0.55, hi: 0.85 },
            min_words: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high: 0.80,
            medium: 0.65,
        }
    }
}

/// Perplexity cut-points and sigmoid shape, fitted on a small evaluation corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// At or below this perplexity the text is AI-typical with high certainty.
    pub ai_threshold: f64,
    /// At or above this perplexity the text is human-typical with high certainty.
    pub human_threshold: f64,
    pub midpoint: f64,
    pub steepness: f64,
    pub hybrid: HybridConfig,
    pub confidence: ConfidenceConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            ai_threshold: 32.03,
            human_threshold: 41.0623,
            midpoint: 37.043,
            steepness: 0.35,
            hybrid: HybridConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ai_threshold < self.human_threshold) {
            return Err(invalid(format!(
                "calibration.ai_threshold ({}) must be below human_threshold ({})",
                self.ai_threshold, self.human_threshold
            )));
        }
        if self.midpoint < self.ai_threshold || self.midpoint > self.human_threshold {
            return Err(invalid(format!(
                "calibration.midpoint ({}) must lie within [{}, {}]",
                self.midpoint, self.ai_threshold, self.human_threshold
            )));
        }
        if !(self.steepness > 0.0) {
            return Err(invalid("calibration.steepness must be > 0"));
        }
        let w = self.hybrid.perplexity_weight;
        if !(w > 0.0 && w <= 1.0) {
            return Err(invalid("calibration.hybrid.perplexity_weight must be in (0, 1]"));
        }
        for (name, range) in [
            ("ttr", self.hybrid.ttr),
            ("entropy", self.hybrid.entropy),
            ("vocab_richness", self.hybrid.vocab_richness),
        ] {
            if !(range.lo < range.hi) {
                return Err(invalid(format!("calibration.hybrid.{} range has lo >= hi", name)));
            }
        }
        let c = &self.confidence;
        if !(c.medium > 0.5 && c.medium <= c.high && c.high <= 1.0) {
            return Err(invalid(
                "calibration.confidence requires 0.5 < medium <= high <= 1.0",
            ));
        }
        Ok(())
    }
}

// ============ Similarity ============

/// Per-metric normalization bounds and weight used by the similarity engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRange {
    pub name: String,
    pub lo: f64,
    pub hi: f64,
    pub weight: f64,
}

impl FeatureRange {
    pub fn new(name: &str, lo: f64, hi: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            lo,
            hi,
            weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub features: Vec<FeatureRange>,
    /// Scores below this are reported as low similarity.
    pub low_threshold: f64,
    /// Scores at or above this are reported as high similarity.
    pub high_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        // Sentence-length variability separates authors best; entropy barely moves
        // across Polish prose of one period.
        Self {
            features: vec![
                FeatureRange::new("sentence_length_std", 1.0, 16.0, 0.45),
                FeatureRange::new("avg_sentence_length", 5.0, 35.0, 0.20),
                FeatureRange::new("ttr", 0.30, 0.90, 0.15),
                FeatureRange::new("lexical_density", 0.40, 0.85, 0.08),
                FeatureRange::new("vocab_richness", 0.20, 0.90, 0.07),
                FeatureRange::new("entropy", 3.0, 9.5, 0.05),
            ],
            low_threshold: 0.55,
            high_threshold: 0.75,
        }
    }
}

impl SimilarityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.features.is_empty() {
            return Err(invalid("similarity.features must not be empty"));
        }
        let mut seen = HashSet::new();
        for f in &self.features {
            if !crate::models::FeatureVector::is_comparable(&f.name) {
                return Err(invalid(format!("similarity feature '{}' is not comparable", f.name)));
            }
            if !seen.insert(f.name.as_str()) {
                return Err(invalid(format!("similarity feature '{}' listed twice", f.name)));
            }
            if !(f.lo < f.hi) {
                return Err(invalid(format!("similarity feature '{}' has lo >= hi", f.name)));
            }
            if !(f.weight >= 0.0) {
                return Err(invalid(format!("similarity feature '{}' has negative weight", f.name)));
            }
        }
        if self.features.iter().all(|f| f.weight == 0.0) {
            return Err(invalid("similarity weights must not all be zero"));
        }
        if !(0.0..=1.0).contains(&self.low_threshold)
            || !(0.0..=1.0).contains(&self.high_threshold)
            || self.low_threshold > self.high_threshold
        {
            return Err(invalid(
                "similarity thresholds require 0 <= low_threshold <= high_threshold <= 1",
            ));
        }
        Ok(())
    }
}

// ============ Model & Limits ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Only the first `max_chars` characters are sent for scoring.
    pub max_chars: usize,
    pub max_length: usize,
    pub min_tokens: usize,
    pub max_perplexity: f64,
}

pub const DEFAULT_MODEL_URL: &str = "http://127.0.0.1:8765";

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MODEL_URL.to_string(),
            timeout_secs: 60,
            max_chars: 4000,
            max_length: 1024,
            min_tokens: 10,
            max_perplexity: 1000.0,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(invalid("model.base_url must not be empty"));
        }
        if self.max_chars == 0 || self.max_length == 0 {
            return Err(invalid("model.max_chars and model.max_length must be > 0"));
        }
        if !(self.max_perplexity > 0.0) {
            return Err(invalid("model.max_perplexity must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_chars: 50,
            max_chars: 500_000,
        }
    }
}

impl InputLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_chars > self.max_chars {
            return Err(invalid("limits.min_chars must not exceed limits.max_chars"));
        }
        Ok(())
    }
}

// ============ Store ============

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store backed by an explicit file; backups go next to it.
    pub fn for_file(config_file: PathBuf) -> Self {
        let config_dir = match config_file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("checklit"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Load and validate configuration; a missing file yields the defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            debug!(path = %self.config_file.display(), "config.missing_using_defaults");
            return Ok(AppConfig::default());
        }
        load_config_file(&self.config_file)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.validate()?;
        fs::create_dir_all(&self.config_dir)?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content)?;
        info!(path = %self.config_file.display(), "config.saved");
        Ok(())
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file)?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Names embed the timestamp, so lexical order is age order.
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }
}

/// Read a config file from an explicit path and validate it.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    info!(path = %path.display(), version = %config.version, "config.loaded");
    Ok(config)
}
