mod in_memory;

use crate::models::{CandidateFilter, Item};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use in_memory::{InMemoryFetcher, Listing};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Candidate backend error: {0}")]
    Backend(String),

    #[error("Candidate fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid fetch request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Candidate source for the ranking engine.
///
/// Implemented by the data-access layer (REST client, database query). `page`
/// is 1-based. Implementations must not rely on being called more than once
/// per pass; the engine never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateFetcher: Send + Sync {
    async fn fetch(
        &self,
        filter: &CandidateFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Item>>;
}
