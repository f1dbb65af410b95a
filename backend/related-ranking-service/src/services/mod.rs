pub mod fetcher;
pub mod ranking;
pub mod scoring;

pub use fetcher::{CandidateFetcher, FetchError, InMemoryFetcher, Listing};
pub use ranking::RankingEngine;
pub use scoring::{RelevanceScorer, ScoringError, SignalWeights};
