use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::CuratorError;

/// Workflow configuration.
///
/// Loaded from an optional TOML file (every field has a default) and then
/// overridden from the environment. Thresholds live here rather than as
/// constants so deployments can tune them without a rebuild.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CuratorConfig {
    pub discovery: DiscoveryConfig,
    pub evaluation: EvaluationConfig,
    pub routing: RoutingConfig,
    pub selection: SelectionConfig,
    pub enrichment: EnrichmentConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Listing URL handed to the catalog on the first round. Criteria keywords
    /// are appended as the `q` query parameter.
    pub seed_url: String,
    /// Links pulled from the queue per round.
    pub round_size: usize,
    /// Pagination window size: items evaluated per batch.
    pub batch_size: usize,
    pub max_depth: u32,
    pub max_queue: usize,
    pub max_total_items: usize,
    pub round_budget_secs: u64,
    pub fetch_concurrency: usize,
    /// Upper bound of the random delay before each detail fetch. 0 disables.
    pub fetch_jitter_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            seed_url: "https://catalog.local/search".to_string(),
            round_size: 20,
            batch_size: 10,
            max_depth: 3,
            max_queue: 200,
            max_total_items: 100,
            round_budget_secs: 30,
            fetch_concurrency: 5,
            fetch_jitter_ms: 250,
        }
    }
}

impl DiscoveryConfig {
    pub fn round_budget(&self) -> Duration {
        Duration::from_secs(self.round_budget_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Confidence at or above which an evaluation counts as a candidate.
    pub high_confidence: f64,
    /// High-confidence evaluations a single batch needs to pass the quality gate.
    pub min_high_confidence: usize,
    pub score_timeout_secs: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.75,
            min_high_confidence: 3,
            score_timeout_secs: 20,
        }
    }
}

impl EvaluationConfig {
    pub fn score_timeout(&self) -> Duration {
        Duration::from_secs(self.score_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    /// Accumulated candidates that end the search early.
    pub min_candidates: usize,
    /// Criteria widenings allowed before the run finalizes best-effort.
    pub max_attempts: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_candidates: 3,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    pub k: usize,
    /// Share of the `k` slots admitted without a diversity check.
    pub unconditional_ratio: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            k: 5,
            unconditional_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichmentConfig {
    /// Enrichment calls allowed per run.
    pub max_calls: u32,
    /// Per-call bound. A slower call is treated as unavailable.
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_calls: 10,
            timeout_secs: 10,
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://curator-cache.db".to_string(),
        }
    }
}

impl CuratorConfig {
    /// Load a TOML file, apply env overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.with_env_overrides()
    }

    /// Defaults plus env overrides, for runs without a config file.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CURATOR_*` overrides (reads `.env` if present) and validate.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Ok(url) = env::var("CURATOR_CACHE_URL") {
            self.cache.url = url;
        }
        if let Ok(seed) = env::var("CURATOR_SEED_URL") {
            self.discovery.seed_url = seed;
        }
        if let Ok(raw) = env::var("CURATOR_MAX_ATTEMPTS") {
            self.routing.max_attempts = raw
                .parse()
                .map_err(|_| CuratorError::Config(format!("CURATOR_MAX_ATTEMPTS={raw}")))?;
        }
        if let Ok(raw) = env::var("CURATOR_MIN_CANDIDATES") {
            self.routing.min_candidates = raw
                .parse()
                .map_err(|_| CuratorError::Config(format!("CURATOR_MIN_CANDIDATES={raw}")))?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), CuratorError> {
        if !(0.0..=1.0).contains(&self.evaluation.high_confidence) {
            return Err(CuratorError::Config(format!(
                "evaluation.high_confidence must be within [0, 1], got {}",
                self.evaluation.high_confidence
            )));
        }
        if self.discovery.batch_size == 0 || self.discovery.round_size == 0 {
            return Err(CuratorError::Config(
                "discovery.batch_size and discovery.round_size must be positive".to_string(),
            ));
        }
        if self.discovery.fetch_concurrency == 0 {
            return Err(CuratorError::Config(
                "discovery.fetch_concurrency must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.selection.unconditional_ratio) {
            return Err(CuratorError::Config(format!(
                "selection.unconditional_ratio must be within [0, 1], got {}",
                self.selection.unconditional_ratio
            )));
        }
        Ok(())
    }

    /// Log effective values at startup.
    pub fn log_summary(&self) {
        tracing::info!(
            seed_url = self.discovery.seed_url.as_str(),
            batch_size = self.discovery.batch_size,
            max_depth = self.discovery.max_depth,
            high_confidence = self.evaluation.high_confidence,
            min_high_confidence = self.evaluation.min_high_confidence,
            min_candidates = self.routing.min_candidates,
            max_attempts = self.routing.max_attempts,
            k = self.selection.k,
            enrichment_calls = self.enrichment.max_calls,
            cache_url = self.cache.url.as_str(),
            "Config loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = CuratorConfig::from_toml_str("").unwrap();
        assert_eq!(config.evaluation.high_confidence, 0.75);
        assert_eq!(config.evaluation.min_high_confidence, 3);
        assert_eq!(config.routing.min_candidates, 3);
        assert_eq!(config.selection.k, 5);
        assert_eq!(config.enrichment.max_calls, 10);
        assert_eq!(config.enrichment.timeout_secs, 10);
        assert_eq!(config.discovery.round_size, 20);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = CuratorConfig::from_toml_str(
            r#"
            [evaluation]
            high_confidence = 0.8

            [routing]
            min_candidates = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.evaluation.high_confidence, 0.8);
        assert_eq!(config.evaluation.min_high_confidence, 3);
        assert_eq!(config.routing.min_candidates, 8);
        assert_eq!(config.routing.max_attempts, 3);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(CuratorConfig::from_toml_str("[routing]\nmin_candiates = 2").is_err());
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = CuratorConfig::default();
        config.evaluation.high_confidence = 1.5;
        assert!(matches!(config.validate(), Err(CuratorError::Config(_))));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[selection]\nk = 7").unwrap();
        let config = CuratorConfig::load(file.path()).unwrap();
        assert_eq!(config.selection.k, 7);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = CuratorConfig::load(Path::new("/nonexistent/curator.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
