// checkLit Core Services
// Text processing, stylometry, detection and comparison

pub mod text_processor;
pub mod sentence_segmenter;
pub mod stylometry;
pub mod readability;
pub mod detection;
pub mod comparison;
pub mod config_store;
pub mod perplexity;
pub mod file_parser;
pub mod analysis;

pub use text_processor::*;
pub use sentence_segmenter::*;
pub use config_store::*;

pub use analysis::{AnalysisError, Analyzer};
pub use comparison::SimilarityEngine;
pub use detection::{AiLikelihoodEstimator, Detection};
pub use file_parser::{clean_text, extract_file, extract_text, ExtractError};
pub use perplexity::{ModelError, PerplexityModel, RemotePerplexityModel, StaticPerplexity};
pub use readability::analyze_quality;
pub use stylometry::analyze_stylometry;

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(24.456, 2), 24.46);
        assert_eq!(round_to(-0.00004, 4), -0.0);
    }
}
