use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Number of related items shown when the caller does not ask for a size.
pub const DEFAULT_TARGET_COUNT: usize = 6;

/// Listing status the engine always filters on.
pub const ACTIVE_STATUS: &str = "active";

/// A transport route listing, used both as the reference and as a candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub route_type: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    /// Departure hours (0-23); the first entry is the primary departure.
    #[serde(default)]
    pub departure_hours: Vec<u8>,
    /// Weekday names, already normalized by the data-access layer.
    #[serde(default)]
    pub operating_days: BTreeSet<String>,
    /// `None` or `0.0` means the fare is unknown.
    #[serde(default)]
    pub fare: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ItemError {
    #[error("Item id is empty")]
    MissingId,

    #[error("Departure hour out of range: {0}")]
    InvalidDepartureHour(u8),

    #[error("Invalid fare: {0}")]
    InvalidFare(f64),
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            origin: origin.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    pub fn with_route_type(mut self, route_type: impl Into<String>) -> Self {
        self.route_type = Some(route_type.into());
        self
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    pub fn with_departure_hours(mut self, hours: impl IntoIterator<Item = u8>) -> Self {
        self.departure_hours = hours.into_iter().collect();
        self
    }

    pub fn with_operating_days<S: Into<String>>(
        mut self,
        days: impl IntoIterator<Item = S>,
    ) -> Self {
        self.operating_days = days.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fare(mut self, fare: f64) -> Self {
        self.fare = Some(fare);
        self
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Fare if known (present and strictly positive).
    pub fn known_fare(&self) -> Option<f64> {
        self.fare.filter(|fare| *fare > 0.0)
    }

    /// Check the record against the data model constraints.
    pub fn validate(&self) -> Result<(), ItemError> {
        if !self.has_id() {
            return Err(ItemError::MissingId);
        }

        if let Some(hour) = self.departure_hours.iter().find(|h| **h > 23) {
            return Err(ItemError::InvalidDepartureHour(*hour));
        }

        if let Some(fare) = self.fare {
            if !fare.is_finite() || fare < 0.0 {
                return Err(ItemError::InvalidFare(fare));
            }
        }

        Ok(())
    }
}

/// Which retrieval pass produced a ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingPass {
    Primary,  // same destination
    Fallback, // same origin (quota fill)
}

impl RankingPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingPass::Primary => "primary",
            RankingPass::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub item: Item,
    pub score: f64,
    pub pass: RankingPass,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.item.id
    }
}

/// Location predicate of a candidate query. Destination and origin filters
/// are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFilter {
    DestinationEquals(String),
    OriginEquals(String),
}

/// Filter descriptor handed to the candidate fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFilter {
    pub status: String,
    pub location: Option<LocationFilter>,
}

impl CandidateFilter {
    pub fn active_destination(destination: impl Into<String>) -> Self {
        Self {
            status: ACTIVE_STATUS.to_string(),
            location: Some(LocationFilter::DestinationEquals(destination.into())),
        }
    }

    pub fn active_origin(origin: impl Into<String>) -> Self {
        Self {
            status: ACTIVE_STATUS.to_string(),
            location: Some(LocationFilter::OriginEquals(origin.into())),
        }
    }

    /// Whether an item with the given status satisfies this filter.
    pub fn matches(&self, item: &Item, status: &str) -> bool {
        if self.status != status {
            return false;
        }

        match &self.location {
            Some(LocationFilter::DestinationEquals(destination)) => {
                item.destination == *destination
            }
            Some(LocationFilter::OriginEquals(origin)) => item.origin == *origin,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRequest {
    pub reference: Item,
    pub target_count: usize,
}

impl RankingRequest {
    pub fn new(reference: Item) -> Self {
        Self {
            reference,
            target_count: DEFAULT_TARGET_COUNT,
        }
    }

    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingStats {
    pub primary_fetched: usize,
    pub primary_kept: usize,
    pub fallback_fetched: usize,
    pub fallback_kept: usize,
    /// Candidates dropped as the reference itself, a repeat id, or an empty id.
    pub discarded: usize,
    pub fetch_failures: usize,
    pub fallback_invoked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    /// Id of the reference this result was computed for.
    pub reference_id: String,
    pub candidates: Vec<ScoredCandidate>,
    pub stats: RankingStats,
}

impl RankingResult {
    pub fn empty(reference_id: impl Into<String>) -> Self {
        Self {
            reference_id: reference_id.into(),
            ..Default::default()
        }
    }

    /// Stale-result guard: a result finished after the user moved on to a
    /// different reference must not be applied.
    pub fn is_for(&self, reference_id: &str) -> bool {
        !self.reference_id.is_empty() && self.reference_id == reference_id
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(ScoredCandidate::id).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.score).collect()
    }
}
