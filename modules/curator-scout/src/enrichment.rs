//! Rate-limited access to the optional enrichment collaborator.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use curator_common::CatalogItem;

use crate::budget::RateLimiter;
use crate::traits::Enricher;

/// Result of asking for enrichment.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Enriched(CatalogItem),
    /// Budget exhausted, collaborator missing, or the call failed or timed out.
    Unavailable,
}

/// Wraps an `Enricher` with a per-run call budget and a per-call timeout.
/// Callers treat the result as optional context and fall back to the item they
/// already have.
#[derive(Clone)]
pub struct GuardedEnricher {
    enricher: Option<Arc<dyn Enricher>>,
    limiter: Arc<dyn RateLimiter>,
    timeout: Duration,
}

impl GuardedEnricher {
    pub fn new(
        enricher: Option<Arc<dyn Enricher>>,
        limiter: Arc<dyn RateLimiter>,
        timeout: Duration,
    ) -> Self {
        Self {
            enricher,
            limiter,
            timeout,
        }
    }

    pub async fn enrich(&self, item: &CatalogItem) -> Enrichment {
        let Some(enricher) = &self.enricher else {
            return Enrichment::Unavailable;
        };
        if !self.limiter.can_call() {
            debug!(title = item.title.as_str(), "Enrichment unavailable: budget exhausted");
            return Enrichment::Unavailable;
        }
        match tokio::time::timeout(self.timeout, enricher.enrich(item)).await {
            Ok(Ok(enriched)) => Enrichment::Enriched(enriched),
            Ok(Err(e)) => {
                warn!(title = item.title.as_str(), error = %e, "Enrichment failed");
                Enrichment::Unavailable
            }
            Err(_) => {
                warn!(
                    title = item.title.as_str(),
                    timeout_secs = self.timeout.as_secs(),
                    "Enrichment timed out"
                );
                Enrichment::Unavailable
            }
        }
    }

    /// Enriched copy when available, otherwise a clone of `item`.
    pub async fn enrich_or_keep(&self, item: &CatalogItem) -> (CatalogItem, bool) {
        match self.enrich(item).await {
            Enrichment::Enriched(enriched) => (enriched, true),
            Enrichment::Unavailable => (item.clone(), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::CallBudget;
    use crate::testing::{item, MockEnricher};

    fn guarded(enricher: Arc<MockEnricher>, calls: u32) -> GuardedEnricher {
        GuardedEnricher::new(
            Some(enricher as Arc<dyn Enricher>),
            Arc::new(CallBudget::new(calls)),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn missing_collaborator_is_unavailable() {
        let guarded =
            GuardedEnricher::new(None, Arc::new(CallBudget::new(5)), Duration::from_secs(2));
        assert_eq!(guarded.enrich(&item("A", &[], 5.0)).await, Enrichment::Unavailable);
    }

    #[tokio::test]
    async fn exhausted_budget_skips_the_call() {
        let enricher = Arc::new(MockEnricher::new());
        let guarded = guarded(enricher.clone(), 1);
        assert!(matches!(
            guarded.enrich(&item("A", &[], 5.0)).await,
            Enrichment::Enriched(_)
        ));
        assert_eq!(guarded.enrich(&item("B", &[], 5.0)).await, Enrichment::Unavailable);
        assert_eq!(enricher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_times_out_and_keeps_item() {
        let enricher = Arc::new(MockEnricher::stalling(Duration::from_secs(3600)));
        let guarded = guarded(enricher.clone(), 1);
        let original = item("A", &["space"], 5.0);

        let (kept, enriched) = guarded.enrich_or_keep(&original).await;

        assert!(!enriched);
        assert_eq!(kept, original);
        assert_eq!(enricher.calls(), 1);
    }
}
