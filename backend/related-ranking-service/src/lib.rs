pub mod config;
pub mod logging;
pub mod models;
pub mod services;

pub use config::{FallbackScoring, RankingConfig};
pub use models::{
    CandidateFilter, Item, LocationFilter, RankingPass, RankingRequest, RankingResult,
    RankingStats, ScoredCandidate,
};
pub use services::{
    CandidateFetcher, FetchError, InMemoryFetcher, Listing, RankingEngine, RelevanceScorer,
    ScoringError, SignalWeights,
};
