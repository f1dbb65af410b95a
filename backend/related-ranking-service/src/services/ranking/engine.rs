use super::RankingError;
use crate::config::{FallbackScoring, RankingConfig};
use crate::models::{
    CandidateFilter, Item, ItemError, RankingPass, RankingRequest, RankingResult, RankingStats,
    ScoredCandidate,
};
use crate::services::fetcher::{CandidateFetcher, FetchError};
use crate::services::scoring::RelevanceScorer;
use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Both passes always read the first page.
const FIRST_PAGE: u32 = 1;

/// Related-route ranking engine
///
/// Holds only immutable state, so one instance can serve concurrent calls
/// for different references.
pub struct RankingEngine {
    fetcher: Arc<dyn CandidateFetcher>,
    scorer: RelevanceScorer,
    config: RankingConfig,
}

impl RankingEngine {
    /// Fails if `config` does not pass [`RankingConfig::validate`].
    pub fn new(fetcher: Arc<dyn CandidateFetcher>, config: RankingConfig) -> Result<Self> {
        config.validate().context("Invalid ranking config")?;

        Ok(Self {
            fetcher,
            scorer: RelevanceScorer::new(),
            config,
        })
    }

    /// Create with a custom relevance scorer
    pub fn with_scorer(mut self, scorer: RelevanceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Rank with the configured default target count.
    pub async fn rank_default(&self, reference: &Item) -> RankingResult {
        self.rank(reference, self.config.default_target_count).await
    }

    pub async fn rank_request(&self, request: RankingRequest) -> RankingResult {
        self.rank(&request.reference, request.target_count).await
    }

    /// Select and order up to `target_count` routes related to `reference`.
    ///
    /// Never fails: an invalid reference or a zero target yields an empty
    /// result, a failed fetch contributes no candidates.
    pub async fn rank(&self, reference: &Item, target_count: usize) -> RankingResult {
        if !reference.has_id() {
            let err = RankingError::from(ItemError::MissingId);
            debug!(error = %err, "Skipping ranking");
            return RankingResult::default();
        }

        if target_count == 0 {
            debug!(reference_id = %reference.id, "Zero target count, nothing to rank");
            return RankingResult::empty(reference.id.as_str());
        }

        let mut stats = RankingStats::default();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(reference.id.clone());

        // 1. Primary pass: same destination, relevance scored
        let primary_filter = CandidateFilter::active_destination(reference.destination.as_str());
        let fetched = self
            .fetch_pass(
                RankingPass::Primary,
                &primary_filter,
                self.config.primary_page_size,
                &mut stats,
            )
            .await;
        stats.primary_fetched = fetched.len();

        let mut primary: Vec<ScoredCandidate> = admit(fetched, &mut seen, &mut stats)
            .into_iter()
            .map(|item| self.score_primary(reference, item))
            .collect();
        sort_by_score(&mut primary);
        stats.primary_kept = primary.len();

        if primary.len() >= target_count {
            primary.truncate(target_count);
            return self.finish(reference, primary, stats);
        }

        // 2. Fallback pass: same origin, quota fill
        stats.fallback_invoked = true;
        let fallback_filter = CandidateFilter::active_origin(reference.origin.as_str());
        let fetched = self
            .fetch_pass(
                RankingPass::Fallback,
                &fallback_filter,
                self.config.fallback_page_size,
                &mut stats,
            )
            .await;
        stats.fallback_fetched = fetched.len();

        let fallback: Vec<ScoredCandidate> = admit(fetched, &mut seen, &mut stats)
            .into_iter()
            .map(|item| self.score_fallback(reference, item))
            .collect();
        stats.fallback_kept = fallback.len();

        // 3. Merge (primary first so ties keep favoring it), sort, cap
        let mut merged = primary;
        merged.extend(fallback);
        sort_by_score(&mut merged);
        merged.truncate(target_count);

        self.finish(reference, merged, stats)
    }

    async fn fetch_pass(
        &self,
        pass: RankingPass,
        filter: &CandidateFilter,
        page_size: u32,
        stats: &mut RankingStats,
    ) -> Vec<Item> {
        match self.fetch_with_timeout(filter, page_size).await {
            Ok(items) => items,
            Err(source) => {
                stats.fetch_failures += 1;
                let err = RankingError::FetchFailure {
                    pass: pass.as_str(),
                    source,
                };
                warn!(error = %err, "Candidate fetch failed, continuing without this pass");
                Vec::new()
            }
        }
    }

    async fn fetch_with_timeout(
        &self,
        filter: &CandidateFilter,
        page_size: u32,
    ) -> Result<Vec<Item>, FetchError> {
        let timeout = self.config.fetch_timeout();

        match tokio::time::timeout(timeout, self.fetcher.fetch(filter, FIRST_PAGE, page_size)).await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    fn score_primary(&self, reference: &Item, item: Item) -> ScoredCandidate {
        let breakdown = self.scorer.breakdown(reference, &item);
        let score = breakdown.total();

        debug!(
            candidate_id = %item.id,
            destination = breakdown.destination,
            route_type = breakdown.route_type,
            service_type = breakdown.service_type,
            time_proximity = breakdown.time_proximity,
            origin = breakdown.origin,
            operating_days = breakdown.operating_days,
            fare = breakdown.fare,
            score = score,
            "Primary candidate scored"
        );

        ScoredCandidate {
            item,
            score,
            pass: RankingPass::Primary,
        }
    }

    fn score_fallback(&self, reference: &Item, item: Item) -> ScoredCandidate {
        let score = match self.config.fallback_scoring {
            FallbackScoring::Flat => self.config.fallback_score,
            FallbackScoring::Relevance => self.scorer.score(reference, &item),
        };

        ScoredCandidate {
            item,
            score,
            pass: RankingPass::Fallback,
        }
    }

    fn finish(
        &self,
        reference: &Item,
        candidates: Vec<ScoredCandidate>,
        stats: RankingStats,
    ) -> RankingResult {
        info!(
            reference_id = %reference.id,
            primary_count = stats.primary_kept,
            fallback_count = stats.fallback_kept,
            fallback_invoked = stats.fallback_invoked,
            fetch_failures = stats.fetch_failures,
            returned = candidates.len(),
            "Related ranking completed"
        );

        RankingResult {
            reference_id: reference.id.clone(),
            candidates,
            stats,
        }
    }
}

/// Keep the first occurrence of each id not yet seen; drop empty ids.
fn admit(items: Vec<Item>, seen: &mut HashSet<String>, stats: &mut RankingStats) -> Vec<Item> {
    let mut admitted = Vec::with_capacity(items.len());

    for item in items {
        if !item.has_id() || !seen.insert(item.id.clone()) {
            stats.discarded += 1;
            continue;
        }
        admitted.push(item);
    }

    admitted
}

/// Stable, descending.
fn sort_by_score(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationFilter;
    use crate::services::fetcher::MockCandidateFetcher;

    fn reference() -> Item {
        Item::new("ref", "Gaborone", "Maun").with_route_type("intercity")
    }

    fn engine(mock: MockCandidateFetcher) -> RankingEngine {
        RankingEngine::new(Arc::new(mock), RankingConfig::default()).expect("valid config")
    }

    fn is_destination(filter: &CandidateFilter, destination: &str) -> bool {
        filter.status == "active"
            && filter.location == Some(LocationFilter::DestinationEquals(destination.to_string()))
    }

    fn is_origin(filter: &CandidateFilter, origin: &str) -> bool {
        filter.status == "active"
            && filter.location == Some(LocationFilter::OriginEquals(origin.to_string()))
    }

    #[tokio::test]
    async fn test_full_primary_pass_skips_fallback() {
        let mut mock = MockCandidateFetcher::new();
        let primary: Vec<Item> = (1..=4)
            .map(|i| Item::new(format!("p{}", i), "Kasane", "Maun"))
            .collect();

        mock.expect_fetch()
            .withf(|filter, page, page_size| {
                is_destination(filter, "Maun") && *page == 1 && *page_size == 20
            })
            .times(1)
            .returning(move |_, _, _| Ok(primary.clone()));

        let result = engine(mock).rank(&reference(), 3).await;

        assert_eq!(result.len(), 3);
        assert!(!result.stats.fallback_invoked);
        assert!(result.candidates.iter().all(|c| c.pass == RankingPass::Primary));
    }

    #[tokio::test]
    async fn test_fallback_pass_uses_origin_filter() {
        let mut mock = MockCandidateFetcher::new();

        mock.expect_fetch()
            .withf(|filter, _, _| is_destination(filter, "Maun"))
            .times(1)
            .returning(|_, _, _| Ok(vec![Item::new("p1", "Kasane", "Maun")]));
        mock.expect_fetch()
            .withf(|filter, page, page_size| {
                is_origin(filter, "Gaborone") && *page == 1 && *page_size == 10
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![Item::new("f1", "Gaborone", "Palapye")]));

        let result = engine(mock).rank(&reference(), 6).await;

        assert_eq!(result.ids(), vec!["p1", "f1"]);
        assert_eq!(result.scores(), vec![100.0, 25.0]);
        assert_eq!(result.candidates[1].pass, RankingPass::Fallback);
        assert!(result.stats.fallback_invoked);
    }

    #[tokio::test]
    async fn test_missing_reference_id_never_fetches() {
        let mut mock = MockCandidateFetcher::new();
        mock.expect_fetch().never();

        let result = engine(mock).rank(&Item::new("", "Gaborone", "Maun"), 6).await;

        assert!(result.is_empty());
        assert_eq!(result.stats, RankingStats::default());
    }

    #[tokio::test]
    async fn test_zero_target_never_fetches() {
        let mut mock = MockCandidateFetcher::new();
        mock.expect_fetch().never();

        let result = engine(mock).rank(&reference(), 0).await;

        assert!(result.is_empty());
        assert!(result.is_for("ref"));
    }

    #[tokio::test]
    async fn test_primary_failure_degrades_to_fallback() {
        let mut mock = MockCandidateFetcher::new();

        mock.expect_fetch()
            .withf(|filter, _, _| is_destination(filter, "Maun"))
            .times(1)
            .returning(|_, _, _| Err(FetchError::Backend("connection refused".to_string())));
        mock.expect_fetch()
            .withf(|filter, _, _| is_origin(filter, "Gaborone"))
            .times(1)
            .returning(|_, _, _| Ok(vec![Item::new("f1", "Gaborone", "Palapye")]));

        let result = engine(mock).rank(&reference(), 6).await;

        assert_eq!(result.ids(), vec!["f1"]);
        assert_eq!(result.stats.fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_both_passes_failing_yields_empty_result() {
        let mut mock = MockCandidateFetcher::new();
        mock.expect_fetch()
            .times(2)
            .returning(|_, _, _| Err(FetchError::Backend("503".to_string())));

        let result = engine(mock).rank(&reference(), 6).await;

        assert!(result.is_empty());
        assert!(result.is_for("ref"));
        assert_eq!(result.stats.fetch_failures, 2);
    }

    #[tokio::test]
    async fn test_duplicates_and_reference_are_discarded() {
        let mut mock = MockCandidateFetcher::new();

        mock.expect_fetch()
            .withf(|filter, _, _| is_destination(filter, "Maun"))
            .returning(|_, _, _| {
                Ok(vec![
                    Item::new("ref", "Gaborone", "Maun"),
                    Item::new("p1", "Kasane", "Maun"),
                    Item::new("p1", "Kasane", "Maun"),
                    Item::new("", "Kasane", "Maun"),
                ])
            });
        mock.expect_fetch()
            .withf(|filter, _, _| is_origin(filter, "Gaborone"))
            .returning(|_, _, _| {
                Ok(vec![
                    Item::new("p1", "Gaborone", "Maun"),
                    Item::new("f1", "Gaborone", "Serowe"),
                    Item::new("f1", "Gaborone", "Serowe"),
                    Item::new("ref", "Gaborone", "Maun"),
                ])
            });

        let result = engine(mock).rank(&reference(), 6).await;

        assert_eq!(result.ids(), vec!["p1", "f1"]);
        assert_eq!(result.stats.primary_fetched, 4);
        assert_eq!(result.stats.fallback_fetched, 4);
        assert_eq!(result.stats.discarded, 6);
    }

    #[tokio::test]
    async fn test_relevance_fallback_scoring() {
        let mut mock = MockCandidateFetcher::new();

        mock.expect_fetch()
            .withf(|filter, _, _| is_destination(filter, "Maun"))
            .returning(|_, _, _| Ok(Vec::new()));
        mock.expect_fetch()
            .withf(|filter, _, _| is_origin(filter, "Gaborone"))
            .returning(|_, _, _| {
                Ok(vec![
                    Item::new("f1", "Gaborone", "Serowe"),
                    Item::new("f2", "Gaborone", "Serowe").with_route_type("intercity"),
                ])
            });

        let config = RankingConfig::default().with_fallback_scoring(FallbackScoring::Relevance);
        let engine = RankingEngine::new(Arc::new(mock), config).expect("valid config");
        assert_eq!(engine.config().fallback_scoring, FallbackScoring::Relevance);

        let result = engine.rank(&reference(), 6).await;

        // origin 15, plus route type 50 for f2
        assert_eq!(result.ids(), vec!["f2", "f1"]);
        assert_eq!(result.scores(), vec![65.0, 15.0]);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let negative = RankingConfig {
            fallback_score: -5.0,
            ..Default::default()
        };
        let not_a_number = RankingConfig {
            fallback_score: f64::NAN,
            ..Default::default()
        };
        let zero_page = RankingConfig {
            primary_page_size: 0,
            ..Default::default()
        };

        for config in [negative, not_a_number, zero_page] {
            let mut mock = MockCandidateFetcher::new();
            mock.expect_fetch().never();
            assert!(RankingEngine::new(Arc::new(mock), config).is_err());
        }
    }

    #[test]
    fn test_sort_by_score_is_stable() {
        let mut candidates = vec![
            ScoredCandidate {
                item: Item::new("a", "X", "Y"),
                score: 25.0,
                pass: RankingPass::Primary,
            },
            ScoredCandidate {
                item: Item::new("b", "X", "Y"),
                score: 40.0,
                pass: RankingPass::Primary,
            },
            ScoredCandidate {
                item: Item::new("c", "X", "Y"),
                score: 25.0,
                pass: RankingPass::Fallback,
            },
        ];

        sort_by_score(&mut candidates);

        let ids: Vec<&str> = candidates.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
