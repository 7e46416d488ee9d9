// Analysis Pipeline
// Orchestrates stylometry, readability, perplexity and detection for one
// text, and fingerprint comparison for two.

use crate::models::{AnalysisReport, CompareReport, FeatureVector, QualityResult};
use crate::services::comparison::SimilarityEngine;
use crate::services::config_store::{AppConfig, ConfigError};
use crate::services::detection::AiLikelihoodEstimator;
use crate::services::perplexity::PerplexityModel;
use crate::services::readability::assess_quality;
use crate::services::sentence_segmenter::segment_sentences;
use crate::services::stylometry::compute_features;
use crate::services::text_processor::{head_chars, normalize_text, tokenize_words};
use chrono::Utc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Characters of the input kept in the report preview.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("text is too short: {chars} chars, minimum is {min}")]
    TextTooShort { chars: usize, min: usize },
    #[error("text is too long: {chars} chars, maximum is {max}")]
    TextTooLong { chars: usize, max: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Analysis front end. Built once from a validated config and shared.
pub struct Analyzer<M> {
    config: AppConfig,
    estimator: AiLikelihoodEstimator,
    similarity: SimilarityEngine,
    model: M,
}

impl<M: PerplexityModel> Analyzer<M> {
    pub fn new(config: AppConfig, model: M) -> Result<Self, AnalysisError> {
        config.validate()?;
        let estimator = AiLikelihoodEstimator::new(&config.calibration)?;
        let similarity = SimilarityEngine::new(&config.similarity)?;
        Ok(Self {
            config,
            estimator,
            similarity,
            model,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn check_limits<'a>(&self, text: &'a str) -> Result<&'a str, AnalysisError> {
        let trimmed = text.trim();
        let chars = trimmed.chars().count();
        let limits = &self.config.limits;
        if chars < limits.min_chars {
            return Err(AnalysisError::TextTooShort {
                chars,
                min: limits.min_chars,
            });
        }
        if chars > limits.max_chars {
            return Err(AnalysisError::TextTooLong {
                chars,
                max: limits.max_chars,
            });
        }
        Ok(trimmed)
    }

    /// Stylometric fingerprint and readability, sharing one tokenization.
    pub fn fingerprint(&self, text: &str) -> (FeatureVector, QualityResult) {
        let cfg = &self.config.stylometry;
        let normalized = normalize_text(text);
        let tokens = tokenize_words(&normalized);
        let sentences = segment_sentences(&normalized, cfg);
        let features = compute_features(&normalized, &tokens, &sentences, cfg);
        let quality = assess_quality(&normalized, &tokens, &sentences);
        (features, quality)
    }

    /// Full analysis with an already known perplexity (`None` when no model
    /// is available). Pure apart from the report id and timestamp.
    pub fn analyze_with_perplexity(
        &self,
        text: &str,
        perplexity: Option<f64>,
    ) -> Result<AnalysisReport, AnalysisError> {
        let text = self.check_limits(text)?;
        let (stylometry, quality) = self.fingerprint(text);
        let ai_detection = self.estimator.estimate(perplexity, Some(&stylometry), text);

        Ok(AnalysisReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            text_preview: head_chars(text, PREVIEW_CHARS).to_string(),
            text_length: text.chars().count(),
            ai_detection,
            stylometry,
            quality,
        })
    }

    /// Score `text` with the perplexity model, then analyze it.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        let start = Instant::now();
        let text = self.check_limits(text)?;
        info!(chars = text.chars().count(), "analysis.start");

        let perplexity = self.model.perplexity(text).await;
        let report = self.analyze_with_perplexity(text, perplexity)?;

        info!(
            id = %report.id,
            method = ?report.ai_detection.method,
            ai_probability = report.ai_detection.ai_probability,
            confidence = report.ai_detection.confidence.as_str(),
            words = report.stylometry.word_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis.done"
        );
        Ok(report)
    }

    /// Compare the fingerprints of two texts. Does not touch the model.
    pub fn compare(&self, text_a: &str, text_b: &str) -> CompareReport {
        let (a, _) = self.fingerprint(text_a);
        let (b, _) = self.fingerprint(text_b);
        let similarity = self.similarity.compare(&a, &b);
        info!(
            score = similarity.similarity_score,
            level = ?similarity.level,
            "analysis.compare"
        );
        CompareReport {
            text_a: a,
            text_b: b,
            similarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, DetectionMethod, SimilarityLevel};
    use crate::services::perplexity::{RemotePerplexityModel, StaticPerplexity};

    const LITERARY: &str = "Petroniusz obudził się zaledwie koło południa i jak zwykle był zmęczony bardzo. \
        Poprzedniego dnia był na uczcie u Nerona, która przeciągnęła się do późna w noc. \
        Od pewnego czasu zdrowie jego poczęło się psuć. Sam mówił, że budzi się rankami jakby zdrętwiały \
        i bez możności zebrania myśli. Ale poranna kąpiel i staranne wygniatanie ciała przez wprawnych \
        niewolników przyśpieszało obieg jego leniwej krwi, rozbudzało go, orzeźwiało, wracało mu siły.";

    const ESSAY: &str = "Sztuczna inteligencja zmienia współczesny świat. Ponadto wpływa na wiele dziedzin życia. \
        Należy zauważyć, że technologia rozwija się bardzo szybko. Warto podkreślić znaczenie edukacji w tym procesie. \
        W podsumowaniu można stwierdzić, że zmiany są nieuniknione.";

    const NOVEL_EXCERPT: &str = "Petroniusz obudził się dopiero koło południa i jak zwykle był znużony. \
        Poprzedniego wieczoru był na uczcie u Nerona, na której dla zabicia czasu zaproponował, by zamiast wina \
        pić tym razem stopione złoto — żart, który rozbawił cesarza do łez i kosztował Petroniusza tylko małą \
        bliznę na wardze od zbyt gorącego pucharu. Kazał się namaścić pachnącymi olejkami i zabrać się do \
        ćwiczeń gimnastycznych, które uważał za niezbędny warunek zachowania zdrowego umysłu w zdrowym ciele.\n\n\
        Lecz zanim przyszło do ćwiczeń, wezwał do siebie Eunicę i kazał jej czytać na głos fragmenty z Homera, \
        podczas gdy sam leżał na łożu z marmurowym zagłówkiem i patrzył w sufit, na którym majster Aleksandros \
        z Antiochii namalował bogów olimpijskich w scenach tak wdzięcznych, że Petroniusz nigdy nie mógł na nie \
        patrzeć bez pewnego szczególnego uczucia. Eunica czytała dobrze. Miała głos niski i spokojny, który nie \
        narzucał się, lecz towarzyszył myślom jak muzyka w tle uczty.\n\n\
        Petroniusz słuchał i myślał o Ligii — tej barbarzyńskiej zakładniczce, którą Winicjusz zobaczył na uczcie \
        i od której nie mógł oderwać oczu. Widział tę scenę i rozumiał ją całkowicie. Kiedy Eunica skończyła \
        czytać, leżał przez chwilę w milczeniu. Potem powiedział: „Winicjusz mnie odwiedzi dziś po południu. \
        Przyjmę go w ogrodzie. Każ przygotować wino z Falernum i owoce.”";

    fn analyzer(value: Option<f64>) -> Analyzer<StaticPerplexity> {
        Analyzer::new(AppConfig::default(), StaticPerplexity::new(value)).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_with_model() {
        let report = analyzer(Some(20.0)).analyze(LITERARY).await.unwrap();
        assert_eq!(report.ai_detection.perplexity, Some(20.0));
        assert_eq!(report.ai_detection.method, DetectionMethod::Hybrid);
        assert!(report.ai_detection.stylometric_score.is_some());
        assert_eq!(report.text_length, LITERARY.chars().count());
        assert!(report.text_preview.chars().count() <= PREVIEW_CHARS);
        assert!(report.stylometry.word_count >= 50);
        assert!(report.quality.lix_score > 0.0);
    }

    #[tokio::test]
    async fn test_unavailable_model_falls_back_to_heuristic() {
        let report = analyzer(None).analyze(ESSAY).await.unwrap();
        let det = &report.ai_detection;
        assert!(det.is_heuristic());
        assert_eq!(det.confidence, Confidence::Low);
        assert!(det.perplexity.is_none());
        assert!(det.indicators.len() >= 3);
        assert!((det.ai_probability + det.human_probability - 1.0).abs() <= 1e-3);
    }

    #[tokio::test]
    async fn test_unreachable_service_does_not_fail_pipeline() {
        let mut config = AppConfig::default();
        config.model.base_url = "http://127.0.0.1:9".to_string();
        config.model.timeout_secs = 5;
        let model = RemotePerplexityModel::new(config.model.clone());
        let analyzer = Analyzer::new(config, model).unwrap();
        let report = analyzer.analyze(LITERARY).await.unwrap();
        assert!(report.ai_detection.is_heuristic());
    }

    #[tokio::test]
    async fn test_input_limits() {
        let a = analyzer(Some(30.0));
        assert!(matches!(
            a.analyze("   Za krótki tekst.   ").await,
            Err(AnalysisError::TextTooShort { chars: 16, min: 50 })
        ));

        let mut config = AppConfig::default();
        config.limits.max_chars = 100;
        let small = Analyzer::new(config, StaticPerplexity::new(Some(30.0))).unwrap();
        assert!(matches!(
            small.analyze(LITERARY).await,
            Err(AnalysisError::TextTooLong { max: 100, .. })
        ));
    }

    #[test]
    fn test_preview_is_truncated() {
        let long = LITERARY.repeat(3);
        let report = analyzer(None).analyze_with_perplexity(&long, None).unwrap();
        assert_eq!(report.text_preview.chars().count(), PREVIEW_CHARS);
        assert!(report.text_length > PREVIEW_CHARS);
    }

    #[test]
    fn test_stylometry_is_deterministic_across_runs() {
        let a = analyzer(Some(35.0));
        let r1 = a.analyze_with_perplexity(LITERARY, Some(35.0)).unwrap();
        let r2 = a.analyze_with_perplexity(LITERARY, Some(35.0)).unwrap();
        assert_eq!(r1.stylometry, r2.stylometry);
        assert_eq!(r1.ai_detection, r2.ai_detection);
        assert_ne!(r1.id, r2.id);
    }

    #[test]
    fn test_compare_texts() {
        let a = analyzer(None);
        let same = a.compare(ESSAY, ESSAY);
        assert_eq!(same.similarity.similarity_score, 1.0);
        assert_eq!(same.similarity.level, SimilarityLevel::High);

        let ab = a.compare(LITERARY, ESSAY);
        let ba = a.compare(ESSAY, LITERARY);
        assert_eq!(ab.similarity.similarity_score, ba.similarity.similarity_score);
        assert!(ab.similarity.similarity_score < 1.0);
    }

    #[test]
    fn test_novel_excerpt_and_formulaic_essay_are_dissimilar() {
        let report = analyzer(None).compare(NOVEL_EXCERPT, ESSAY);
        let novel = &report.text_a;
        let essay = &report.text_b;
        assert!(
            (12.0..=18.0).contains(&novel.sentence_length_std),
            "novel std {}",
            novel.sentence_length_std
        );
        assert!((6.7..=7.3).contains(&novel.entropy), "novel entropy {}", novel.entropy);
        assert!(essay.sentence_length_std < 6.0);

        let low = AppConfig::default().similarity.low_threshold;
        assert!(
            report.similarity.similarity_score < low,
            "score {}",
            report.similarity.similarity_score
        );
        assert_eq!(report.similarity.level, SimilarityLevel::Low);
    }

    #[test]
    fn test_report_serializes_expected_sections() {
        let report = analyzer(Some(50.0)).analyze_with_perplexity(LITERARY, Some(50.0)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        for key in ["id", "created_at", "text_preview", "text_length", "ai_detection", "stylometry", "quality"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["ai_detection"]["label"], "Human-written");
        assert!(json["quality"]["lix_level"].is_string());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.similarity.low_threshold = 0.9;
        config.similarity.high_threshold = 0.5;
        assert!(matches!(
            Analyzer::new(config, StaticPerplexity::unavailable()),
            Err(AnalysisError::Config(ConfigError::Invalid(_)))
        ));
    }
}
