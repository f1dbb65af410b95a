use super::{CandidateFetcher, FetchError, Result};
use crate::models::{CandidateFilter, Item, ACTIVE_STATUS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A stored item together with its listing status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    ACTIVE_STATUS.to_string()
}

impl Listing {
    pub fn active(item: Item) -> Self {
        Self {
            item,
            status: default_status(),
        }
    }

    pub fn with_status(item: Item, status: impl Into<String>) -> Self {
        Self {
            item,
            status: status.into(),
        }
    }
}

/// In-memory candidate pool
///
/// Answers fetches from an owned list in insertion order. Useful for
/// embedding the engine over an already-loaded catalogue and in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    listings: Vec<Listing>,
}

impl InMemoryFetcher {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// Every item is stored as an active listing.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        Self::new(items.into_iter().map(Listing::active).collect())
    }

    /// Parse a JSON array of listings (`status` defaults to "active").
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let listings: Vec<Listing> = serde_json::from_str(json)?;
        Ok(Self::new(listings))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl CandidateFetcher for InMemoryFetcher {
    async fn fetch(
        &self,
        filter: &CandidateFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Item>> {
        if page == 0 {
            return Err(FetchError::InvalidRequest("page is 1-based".to_string()));
        }
        if page_size == 0 {
            return Err(FetchError::InvalidRequest("page_size must be positive".to_string()));
        }

        let skip = (page as usize - 1) * page_size as usize;
        let items: Vec<Item> = self
            .listings
            .iter()
            .filter(|listing| filter.matches(&listing.item, &listing.status))
            .skip(skip)
            .take(page_size as usize)
            .map(|listing| listing.item.clone())
            .collect();

        debug!(
            page = page,
            page_size = page_size,
            returned = items.len(),
            "In-memory fetch completed"
        );

        Ok(items)
    }
}
