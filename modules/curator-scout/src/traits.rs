// Collaborator boundaries for the workflow.
//
// Everything that talks to the outside world sits behind one of these traits
// so tests can swap in the mocks from `testing`: no network, no model calls.

use anyhow::Result;
use async_trait::async_trait;

use curator_common::{CatalogItem, Criteria, Evaluation, LinkRef, RawDetail};

// ---------------------------------------------------------------------------
// CatalogSource: listing + detail pages
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Seed listing for a run.
    async fn list_initial_links(&self, seed_url: &str) -> Result<Vec<LinkRef>>;

    /// Detail record for one link. "Not found" is a partial record, not an error.
    async fn fetch_details(&self, link: &LinkRef) -> Result<RawDetail>;
}

// ---------------------------------------------------------------------------
// CriteriaExtractor: free text → structured criteria
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CriteriaExtractor: Send + Sync {
    /// Failure here ends the run.
    async fn extract(&self, request: &str) -> Result<Criteria>;
}

// ---------------------------------------------------------------------------
// ItemScorer: external judgment
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ItemScorer: Send + Sync {
    /// May fail per call; the evaluator substitutes the heuristic score.
    async fn score(&self, item: &CatalogItem, criteria: &Criteria) -> Result<Evaluation>;
}

// ---------------------------------------------------------------------------
// ItemNormalizer: raw detail → CatalogItem
// ---------------------------------------------------------------------------

/// Pure; fills conservative defaults for anything the page didn't carry.
pub trait ItemNormalizer: Send + Sync {
    fn normalize(&self, raw: &RawDetail) -> CatalogItem;
}

// ---------------------------------------------------------------------------
// Enricher: optional extra context, rate limited
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Return an enriched copy of `item`.
    async fn enrich(&self, item: &CatalogItem) -> Result<CatalogItem>;
}
