use super::{Result, ScoringError};
use crate::models::Item;

/// Relative fare difference below which two fares count as similar.
const FARE_SIMILARITY_RATIO: f64 = 0.5;

/// Per-signal contributions. Scores are summed without a cap; with the
/// default weights an identical candidate scores 235.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalWeights {
    pub destination_match: f64,
    pub route_type_match: f64,
    pub service_type_match: f64,
    /// Score for identical departure hours; loses one point per hour apart.
    pub time_proximity: f64,
    pub origin_match: f64,
    /// Multiplied by the operating-days overlap ratio (0.0 - 1.0).
    pub operating_days_overlap: f64,
    pub fare_similarity: f64,
}

impl SignalWeights {
    /// Every weight must be finite and non-negative so scores stay >= 0.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("destination_match", self.destination_match),
            ("route_type_match", self.route_type_match),
            ("service_type_match", self.service_type_match),
            ("time_proximity", self.time_proximity),
            ("origin_match", self.origin_match),
            ("operating_days_overlap", self.operating_days_overlap),
            ("fare_similarity", self.fare_similarity),
        ];

        match weights
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            Some((signal, value)) => Err(ScoringError::InvalidWeight { signal, value }),
            None => Ok(()),
        }
    }
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            destination_match: 100.0,
            route_type_match: 50.0,
            service_type_match: 30.0,
            time_proximity: 20.0,
            origin_match: 15.0,
            operating_days_overlap: 10.0,
            fare_similarity: 10.0,
        }
    }
}

/// Contribution of every signal for one candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub destination: f64,
    pub route_type: f64,
    pub service_type: f64,
    pub time_proximity: f64,
    pub origin: f64,
    pub operating_days: f64,
    pub fare: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.destination
            + self.route_type
            + self.service_type
            + self.time_proximity
            + self.origin
            + self.operating_days
            + self.fare
    }
}

/// Relevance scorer for related-route ranking
#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    weights: SignalWeights,
}

impl RelevanceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: SignalWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &SignalWeights {
        &self.weights
    }

    /// Composite score of `candidate` against `reference`. Always >= 0.
    pub fn score(&self, reference: &Item, candidate: &Item) -> f64 {
        self.breakdown(reference, candidate).total()
    }

    /// Score every signal separately.
    pub fn breakdown(&self, reference: &Item, candidate: &Item) -> ScoreBreakdown {
        let w = &self.weights;

        ScoreBreakdown {
            destination: if candidate.destination == reference.destination {
                w.destination_match
            } else {
                0.0
            },
            route_type: if optional_match(&reference.route_type, &candidate.route_type) {
                w.route_type_match
            } else {
                0.0
            },
            service_type: if optional_match(&reference.service_type, &candidate.service_type) {
                w.service_type_match
            } else {
                0.0
            },
            time_proximity: self.time_proximity(reference, candidate),
            origin: if candidate.origin == reference.origin {
                w.origin_match
            } else {
                0.0
            },
            operating_days: self.operating_days_overlap(reference, candidate),
            fare: self.fare_similarity(reference, candidate),
        }
    }

    /// `max(0, weight - diff)` where diff is the closest candidate departure
    /// to the reference's first departure hour.
    fn time_proximity(&self, reference: &Item, candidate: &Item) -> f64 {
        let Some(&ref_hour) = reference.departure_hours.first() else {
            return 0.0;
        };

        let closest = candidate
            .departure_hours
            .iter()
            .map(|&hour| (i32::from(hour) - i32::from(ref_hour)).abs())
            .min();

        match closest {
            Some(diff) => (self.weights.time_proximity - f64::from(diff)).max(0.0),
            None => 0.0,
        }
    }

    /// Shared days over the larger of the two sets.
    fn operating_days_overlap(&self, reference: &Item, candidate: &Item) -> f64 {
        // Also guards the both-empty case against 0 / 0.
        if reference.operating_days.is_empty() || candidate.operating_days.is_empty() {
            return 0.0;
        }

        let larger = reference
            .operating_days
            .len()
            .max(candidate.operating_days.len());
        let shared = reference
            .operating_days
            .intersection(&candidate.operating_days)
            .count();

        (shared as f64 / larger as f64) * self.weights.operating_days_overlap
    }

    fn fare_similarity(&self, reference: &Item, candidate: &Item) -> f64 {
        let (Some(a), Some(b)) = (reference.known_fare(), candidate.known_fare()) else {
            return 0.0;
        };

        let ratio = (a - b).abs() / ((a + b) / 2.0);
        if ratio < FARE_SIMILARITY_RATIO {
            self.weights.fare_similarity
        } else {
            0.0
        }
    }
}

/// Both present, non-empty and equal.
fn optional_match(a: &Option<String>, b: &Option<String>) -> bool {
    match (a.as_deref(), b.as_deref()) {
        (Some(a), Some(b)) => !a.is_empty() && a == b,
        _ => false,
    }
}
