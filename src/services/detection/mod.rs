// Detection Module
// AI-likelihood estimation organized into specialized submodules:
// - calibration: Perplexity to probability mapping and the gray zone
// - confidence: High/Medium/Low labelling
// - stylometric: Lexical-diversity corrector for the hybrid blend
// - fallback: Heuristic estimate when no perplexity is available
// - estimator: Ties the above into a single detection outcome

pub mod calibration;
pub mod confidence;
pub mod stylometric;
pub mod fallback;
pub mod estimator;

// Re-export commonly used items
pub use calibration::PerplexityCalibration;
pub use confidence::confidence_for;
pub use estimator::{AiLikelihoodEstimator, Detection};
pub use fallback::{heuristic_estimate, HeuristicEstimate, AI_INDICATORS};
pub use stylometric::stylometric_ai_score;
