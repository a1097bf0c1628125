// Test mocks for the curator workflow.
//
// One mock per collaborator boundary:
// - MockCatalog (CatalogSource): URL→page map, scripted listing, slow pages
// - MockExtractor (CriteriaExtractor): fixed criteria or a failure
// - MockScorer (ItemScorer): title→confidence, failing and stalling titles
// - MockEnricher (Enricher): tags items, counts calls, optionally stalls
//
// Plus helpers for building items, pages, evaluations and a quiet config.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use curator_common::{
    sanitize_url, CatalogItem, Criteria, CuratorConfig, Evaluation, LinkRef, ProcessedItem,
    Provenance, RawDetail,
};

use crate::traits::{CatalogSource, CriteriaExtractor, Enricher, ItemScorer};

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

/// HashMap-based catalog. Returns `Err` for unregistered pages.
/// Builder pattern: `.on_listing()`, `.on_page()`, `.on_slow_page()`.
#[derive(Default)]
pub struct MockCatalog {
    listing: Option<Vec<LinkRef>>,
    pages: HashMap<String, RawDetail>,
    delays: HashMap<String, Duration>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            listing: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn on_listing(mut self, links: Vec<LinkRef>) -> Self {
        self.listing = Some(links);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.listing = None;
        self
    }

    pub fn on_page(mut self, page: RawDetail) -> Self {
        self.pages.insert(sanitize_url(&page.url), page);
        self
    }

    pub fn on_slow_page(mut self, page: RawDetail, delay: Duration) -> Self {
        let key = sanitize_url(&page.url);
        self.delays.insert(key.clone(), delay);
        self.pages.insert(key, page);
        self
    }

    /// Shared log of every URL passed to `fetch_details`, in call order.
    pub fn fetch_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.fetches.clone()
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    async fn list_initial_links(&self, _seed_url: &str) -> Result<Vec<LinkRef>> {
        match &self.listing {
            Some(links) => Ok(links.clone()),
            None => bail!("MockCatalog: listing unavailable"),
        }
    }

    async fn fetch_details(&self, link: &LinkRef) -> Result<RawDetail> {
        let key = sanitize_url(&link.url);
        if let Ok(mut log) = self.fetches.lock() {
            log.push(key.clone());
        }
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        match self.pages.get(&key) {
            Some(page) => Ok(page.clone()),
            None => bail!("MockCatalog: no page registered for {key}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

pub struct MockExtractor {
    criteria: Option<Criteria>,
}

impl MockExtractor {
    pub fn returning(criteria: Criteria) -> Self {
        Self {
            criteria: Some(criteria),
        }
    }

    pub fn failing() -> Self {
        Self { criteria: None }
    }
}

#[async_trait]
impl CriteriaExtractor for MockExtractor {
    async fn extract(&self, _request: &str) -> Result<Criteria> {
        match &self.criteria {
            Some(criteria) => Ok(criteria.clone()),
            None => bail!("MockExtractor: model unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockScorer
// ---------------------------------------------------------------------------

/// Title→confidence scorer. Unknown titles get the default confidence.
pub struct MockScorer {
    scores: HashMap<String, f64>,
    failing: HashSet<String>,
    stalls: HashMap<String, Duration>,
    default_confidence: f64,
    calls: AtomicU32,
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScorer {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            failing: HashSet::new(),
            stalls: HashMap::new(),
            default_confidence: 0.5,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_score(mut self, title: &str, confidence: f64) -> Self {
        self.scores.insert(title.to_string(), confidence);
        self
    }

    pub fn with_default(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }

    pub fn failing_on(mut self, title: &str) -> Self {
        self.failing.insert(title.to_string());
        self
    }

    pub fn stalling_on(mut self, title: &str, delay: Duration) -> Self {
        self.stalls.insert(title.to_string(), delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemScorer for MockScorer {
    async fn score(&self, item: &CatalogItem, _criteria: &Criteria) -> Result<Evaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stalls.get(&item.title) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&item.title) {
            bail!("MockScorer: scoring failed for {}", item.title);
        }
        let confidence = self
            .scores
            .get(&item.title)
            .copied()
            .unwrap_or(self.default_confidence);
        Ok(Evaluation::new(item.clone(), confidence, "mock score"))
    }
}

// ---------------------------------------------------------------------------
// MockEnricher
// ---------------------------------------------------------------------------

/// Adds an `enriched` theme and counts calls.
#[derive(Default)]
pub struct MockEnricher {
    calls: AtomicU32,
    stall: Option<Duration>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` before every answer.
    pub fn stalling(delay: Duration) -> Self {
        Self {
            stall: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    async fn enrich(&self, item: &CatalogItem) -> Result<CatalogItem> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        let mut enriched = item.clone();
        enriched.themes.push("enriched".to_string());
        Ok(enriched)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Defaults with jitter off and short budgets.
pub fn test_config() -> CuratorConfig {
    let mut config = CuratorConfig::default();
    config.discovery.fetch_jitter_ms = 0;
    config.discovery.round_budget_secs = 5;
    config.evaluation.score_timeout_secs = 5;
    config.enrichment.timeout_secs = 5;
    config
}

pub fn item(title: &str, tags: &[&str], rating: f32) -> CatalogItem {
    let mut item = CatalogItem::new(title);
    item.tags = tags.iter().map(|t| t.to_string()).collect();
    item.rating = rating;
    item
}

pub fn evaluation(title: &str, confidence: f64) -> Evaluation {
    Evaluation::new(CatalogItem::new(title), confidence, "test")
}

pub fn processed(title: &str) -> ProcessedItem {
    ProcessedItem {
        item: CatalogItem::new(title),
        source_url: format!("https://catalog.local/{}", curator_common::normalize_key(title)),
        provenance: Provenance::Initial,
        processed_at: Utc::now(),
    }
}

/// A detail page whose body lists `tags` and whose outbound links are `links`.
pub fn page(url: &str, title: &str, tags: &[&str], links: &[&str]) -> RawDetail {
    RawDetail {
        url: url.to_string(),
        title: title.to_string(),
        raw_content: format!("Tags: {}\nRating: 7", tags.join(", ")),
        links: links
            .iter()
            .map(|l| LinkRef::new(format!("link to {l}"), *l))
            .collect(),
        ..RawDetail::default()
    }
}

/// `n` linked pages `https://catalog.local/item/{i}` titled `Item {i}`.
pub fn numbered_pages(n: usize) -> (Vec<LinkRef>, Vec<RawDetail>) {
    let links = (0..n)
        .map(|i| LinkRef::new(format!("Item {i}"), format!("https://catalog.local/item/{i}")))
        .collect();
    let pages = (0..n)
        .map(|i| {
            page(
                &format!("https://catalog.local/item/{i}"),
                &format!("Item {i}"),
                &["space"],
                &[],
            )
        })
        .collect();
    (links, pages)
}
