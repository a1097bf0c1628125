//! Discovery: turn the link queue into normalized items.
//!
//! One call to [`DiscoveryLoop::discover`] is one round. The first round of a
//! run lists the catalog's initial links; every round then pulls a slice of the
//! queue, serves what it can from the cache, fetches the rest with bounded
//! concurrency, and enqueues the links found on each page, whether it was
//! fetched or cached. Guardrails cut a round short instead of failing it.

pub mod links;
pub mod queue;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use curator_cache::CacheStore;
use curator_common::config::DiscoveryConfig;
use curator_common::{
    CachedPage, CatalogItem, Criteria, LinkRef, ProcessedItem, Provenance, QueuedLink, RawDetail,
};

use crate::pipeline::state::WorkflowState;
use crate::traits::{CatalogSource, ItemNormalizer};

use self::links::{extract_links, seed_url};
use self::queue::LinkQueue;

/// Which cap cut a round short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guardrail {
    /// `max_total_items` reached.
    TotalItems,
    /// Queue ceiling reached while enqueueing extracted links.
    QueueCeiling,
    /// Round wall-clock budget exhausted.
    WallClock,
}

impl std::fmt::Display for Guardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guardrail::TotalItems => write!(f, "total_items"),
            Guardrail::QueueCeiling => write!(f, "queue_ceiling"),
            Guardrail::WallClock => write!(f, "wall_clock"),
        }
    }
}

/// What one discovery round produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryDelta {
    pub new_items: Vec<ProcessedItem>,
    /// Queue and seen set after the round.
    pub links: LinkQueue,
    pub depth: u32,
    /// False when the evaluation window was already covered and no network
    /// work ran.
    pub fetched: bool,
    pub links_fetched: u32,
    pub cache_hits: u32,
    pub fetch_failures: u32,
    pub links_dropped: u32,
    pub truncated: Option<Guardrail>,
}

/// Runs discovery rounds against a catalog, with a cache in front of it.
#[derive(Clone)]
pub struct DiscoveryLoop {
    catalog: Arc<dyn CatalogSource>,
    normalizer: Arc<dyn ItemNormalizer>,
    cache: Arc<dyn CacheStore>,
    config: DiscoveryConfig,
}

impl DiscoveryLoop {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        normalizer: Arc<dyn ItemNormalizer>,
        cache: Arc<dyn CacheStore>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            catalog,
            normalizer,
            cache,
            config,
        }
    }

    /// Run one round against a snapshot of the workflow state.
    ///
    /// Never fails: listing and fetch errors shrink the round, they do not
    /// abort it.
    pub async fn discover(&self, state: &WorkflowState, criteria: &Criteria) -> DiscoveryDelta {
        let offset = state.pagination.offset;
        let window_len = state.pagination.size;
        let mut links = state.links.clone();
        let mut delta = DiscoveryDelta {
            new_items: Vec::new(),
            links: LinkQueue::default(),
            depth: state.depth.current,
            fetched: false,
            links_fetched: 0,
            cache_hits: 0,
            fetch_failures: 0,
            links_dropped: 0,
            truncated: None,
        };

        // Window already covered by items on hand: no network work.
        if state.total_discovered() >= offset.saturating_add(window_len) {
            debug!(offset, window_len, "Discovery window already satisfied");
            delta.links = links;
            return delta;
        }

        delta.fetched = true;
        delta.depth = state.depth.current.saturating_add(1).min(state.depth.max);

        let first_round =
            state.processed.is_empty() && links.is_empty() && state.depth.current == 0;
        if first_round {
            let listing_url = seed_url(&self.config.seed_url, &criteria.keywords);
            match self.catalog.list_initial_links(&listing_url).await {
                Ok(initial) => {
                    let (added, dropped) = links.extend(&initial, Provenance::Initial);
                    delta.links_dropped += dropped as u32;
                    info!(
                        listing_url = listing_url.as_str(),
                        listed = initial.len(),
                        added,
                        "Initial links listed"
                    );
                }
                Err(e) => {
                    warn!(
                        listing_url = listing_url.as_str(),
                        error = %e,
                        "Initial listing failed, nothing to discover"
                    );
                    delta.links = links;
                    return delta;
                }
            }
        }

        let headroom = self
            .config
            .max_total_items
            .saturating_sub(state.total_discovered());
        if headroom == 0 {
            info!(max = self.config.max_total_items, "Item ceiling reached, skipping round");
            delta.truncated = Some(Guardrail::TotalItems);
            delta.links = links;
            return delta;
        }
        if headroom < self.config.round_size {
            delta.truncated = Some(Guardrail::TotalItems);
        }

        let pulled = links.pull(self.config.round_size.min(headroom));
        if pulled.is_empty() {
            delta.links = links;
            return delta;
        }

        // Cache first, keyed by sanitized URL.
        let urls: Vec<String> = pulled.iter().map(|l| l.url.clone()).collect();
        let mut cached = self.cache.get_many(&urls).await;
        let mut ordered: Vec<Option<ProcessedItem>> = vec![None; pulled.len()];
        let mut misses: Vec<(usize, QueuedLink)> = Vec::new();
        for (idx, link) in pulled.into_iter().enumerate() {
            match cached.remove(&link.url) {
                Some(page) => {
                    delta.cache_hits += 1;
                    enqueue_page_links(&mut links, &mut delta, &page.links, &link);
                    ordered[idx] = Some(processed(page.item, &link));
                }
                None => misses.push((idx, link)),
            }
        }

        let (fetched, failures, timed_out) = self.fetch_all(misses).await;
        delta.fetch_failures = failures;
        if timed_out {
            delta.truncated = Some(Guardrail::WallClock);
        }

        let mut writes: Vec<(String, CachedPage)> = Vec::new();
        for (idx, link, raw) in fetched {
            let mut item = self.normalizer.normalize(&raw);
            if item.title.trim().is_empty() {
                item.title = link.title.clone();
            }
            delta.links_fetched += 1;

            let page_links = extract_links(&raw.links);
            enqueue_page_links(&mut links, &mut delta, &page_links, &link);

            let page = CachedPage::new(item.clone(), page_links);
            writes.push((link.url.clone(), page.clone()));
            writes.push((item.cache_key(), page));
            ordered[idx] = Some(processed(item, &link));
        }
        self.cache.set_many(&writes).await;

        delta.new_items = ordered.into_iter().flatten().collect();

        if let Some(guardrail) = delta.truncated {
            info!(%guardrail, "Discovery round truncated");
        }
        info!(
            depth = delta.depth,
            new_items = delta.new_items.len(),
            cache_hits = delta.cache_hits,
            fetched = delta.links_fetched,
            failures = delta.fetch_failures,
            queued = links.len(),
            "Discovery round complete"
        );
        delta.links = links;
        delta
    }

    /// Fetch details for cache misses. Returns successes in pull order, the
    /// failure count, and whether the wall-clock budget cut the round short.
    async fn fetch_all(
        &self,
        misses: Vec<(usize, QueuedLink)>,
    ) -> (Vec<(usize, QueuedLink, RawDetail)>, u32, bool) {
        if misses.is_empty() {
            return (Vec::new(), 0, false);
        }

        let deadline = tokio::time::Instant::now() + self.config.round_budget();
        let jitter_ms = self.config.fetch_jitter_ms;
        let catalog = self.catalog.clone();
        let mut results = stream::iter(misses.into_iter().map(|(idx, link)| {
            let catalog = catalog.clone();
            async move {
                let delay = jitter(jitter_ms);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let result = catalog.fetch_details(&link.as_link_ref()).await;
                (idx, link, result)
            }
        }))
        .buffer_unordered(self.config.fetch_concurrency.max(1));

        let mut fetched = Vec::new();
        let mut failures = 0u32;
        let mut timed_out = false;
        loop {
            match tokio::time::timeout_at(deadline, results.next()).await {
                Ok(Some((idx, link, Ok(raw)))) => fetched.push((idx, link, raw)),
                Ok(Some((_, link, Err(e)))) => {
                    warn!(url = link.url.as_str(), error = %e, "Detail fetch failed");
                    failures += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        budget_secs = self.config.round_budget_secs,
                        completed = fetched.len(),
                        "Round budget exhausted, abandoning in-flight fetches"
                    );
                    timed_out = true;
                    break;
                }
            }
        }

        fetched.sort_by_key(|(idx, _, _)| *idx);
        (fetched, failures, timed_out)
    }
}

/// Queue the content links of `link`'s page one hop deeper.
fn enqueue_page_links(
    links: &mut LinkQueue,
    delta: &mut DiscoveryDelta,
    page_links: &[LinkRef],
    link: &QueuedLink,
) {
    let (added, dropped) = links.extend_from(page_links, link);
    if dropped > 0 {
        delta.links_dropped += dropped as u32;
        delta.truncated.get_or_insert(Guardrail::QueueCeiling);
    }
    debug!(url = link.url.as_str(), added, dropped, "Page links enqueued");
}

fn processed(item: CatalogItem, link: &QueuedLink) -> ProcessedItem {
    ProcessedItem {
        item,
        source_url: link.url.clone(),
        provenance: link.provenance,
        processed_at: Utc::now(),
    }
}

fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}
