use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::models::DEFAULT_TARGET_COUNT;

/// Prefix of every environment variable read by [`RankingConfig::from_env`].
pub const ENV_PREFIX: &str = "RELATED_RANKING_";

/// How quota-fill candidates are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackScoring {
    /// Every fallback candidate gets `fallback_score`.
    #[default]
    Flat,
    /// Fallback candidates go through the relevance scorer.
    Relevance,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_target_count")]
    pub default_target_count: usize,
    #[serde(default = "default_primary_page_size")]
    pub primary_page_size: u32,
    #[serde(default = "default_fallback_page_size")]
    pub fallback_page_size: u32,
    #[serde(default = "default_fallback_score")]
    pub fallback_score: f64,
    #[serde(default)]
    pub fallback_scoring: FallbackScoring,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_target_count() -> usize {
    DEFAULT_TARGET_COUNT
}

fn default_primary_page_size() -> u32 {
    20
}

fn default_fallback_page_size() -> u32 {
    10
}

fn default_fallback_score() -> f64 {
    25.0
}

fn default_fetch_timeout_ms() -> u64 {
    3000
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_target_count: default_target_count(),
            primary_page_size: default_primary_page_size(),
            fallback_page_size: default_fallback_page_size(),
            fallback_score: default_fallback_score(),
            fallback_scoring: FallbackScoring::default(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl RankingConfig {
    /// Load from `RELATED_RANKING_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Self = envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("Failed to read ranking config from environment")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from explicit `(name, value)` pairs, names including the prefix.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("Failed to parse ranking config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.default_target_count > 0,
            "default_target_count must be positive"
        );
        ensure!(self.primary_page_size > 0, "primary_page_size must be positive");
        ensure!(self.fallback_page_size > 0, "fallback_page_size must be positive");
        ensure!(
            self.fallback_score.is_finite() && self.fallback_score >= 0.0,
            "fallback_score must be a non-negative number, got {}",
            self.fallback_score
        );
        ensure!(self.fetch_timeout_ms > 0, "fetch_timeout_ms must be positive");
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn with_fallback_scoring(mut self, mode: FallbackScoring) -> Self {
        self.fallback_scoring = mode;
        self
    }

    /// Rounded up to whole milliseconds, never below 1 ms.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_micros().div_ceil(1000).max(1);
        self.fetch_timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }
}
