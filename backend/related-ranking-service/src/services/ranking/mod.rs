/// Ranking Module
///
/// Two-pass related-route ranking.
///
/// # Workflow
/// 1. Primary pass: fetch active routes with the reference's destination and
///    score them with the relevance scorer
/// 2. If the primary pass under-fills the target, fetch active routes with
///    the reference's origin and quota-fill from them
/// 3. Dedup by id (primary first), merge, stable sort, truncate
///
/// Fetch failures degrade to an empty pass; nothing is surfaced to the caller.
pub mod engine;

pub use engine::RankingEngine;

use crate::models::ItemError;
use crate::services::fetcher::FetchError;
use thiserror::Error;

/// Conditions the engine recovers from locally. They are logged, never
/// returned.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Invalid reference: {0}")]
    InvalidReference(#[from] ItemError),

    #[error("{pass} fetch failed: {source}")]
    FetchFailure {
        pass: &'static str,
        #[source]
        source: FetchError,
    },
}
