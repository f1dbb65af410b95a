// ============================================
// Relevance Scoring (相关性打分)
// ============================================
//
// Composite similarity between a reference route and one candidate.
//
// Signals (additive, no normalization):
// - Destination match
// - Route type / service type match
// - Departure time proximity
// - Origin match
// - Operating-days overlap
// - Fare similarity
//
// Pure and deterministic: no I/O, no state.

pub mod relevance_scorer;

pub use relevance_scorer::{RelevanceScorer, ScoreBreakdown, SignalWeights};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("Invalid weight for {signal}: {value}")]
    InvalidWeight { signal: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, ScoringError>;
