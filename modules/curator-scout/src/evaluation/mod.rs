//! Batch evaluation of discovered items against the current criteria.

pub mod gate;
pub mod heuristic;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use curator_common::{CatalogItem, Criteria, Evaluation};

use crate::enrichment::GuardedEnricher;
use crate::traits::ItemScorer;

pub use gate::{GateVerdict, QualityGate};
pub use heuristic::fallback_evaluation;

/// Evaluations for one batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub evaluations: Vec<Evaluation>,
    /// Items scored by the heuristic because the scorer failed or timed out.
    pub fallbacks: u32,
    pub enriched: u32,
}

/// Scores every item in a batch concurrently. Never fails: each item falls
/// back to the heuristic independently.
#[derive(Clone)]
pub struct BatchEvaluator {
    scorer: Arc<dyn ItemScorer>,
    enricher: GuardedEnricher,
    timeout: Duration,
}

impl BatchEvaluator {
    pub fn new(scorer: Arc<dyn ItemScorer>, enricher: GuardedEnricher, timeout: Duration) -> Self {
        Self {
            scorer,
            enricher,
            timeout,
        }
    }

    pub async fn evaluate(&self, items: &[CatalogItem], criteria: &Criteria) -> BatchReport {
        let outcomes = join_all(items.iter().map(|item| self.evaluate_one(item, criteria))).await;

        let mut report = BatchReport::default();
        for (evaluation, fell_back, enriched) in outcomes {
            report.fallbacks += u32::from(fell_back);
            report.enriched += u32::from(enriched);
            report.evaluations.push(evaluation);
        }
        debug!(
            items = items.len(),
            fallbacks = report.fallbacks,
            enriched = report.enriched,
            "Batch evaluated"
        );
        report
    }

    /// Returns the evaluation, whether it fell back, and whether enrichment ran.
    async fn evaluate_one(
        &self,
        item: &CatalogItem,
        criteria: &Criteria,
    ) -> (Evaluation, bool, bool) {
        let (subject, enriched) = self.enricher.enrich_or_keep(item).await;

        match tokio::time::timeout(self.timeout, self.scorer.score(&subject, criteria)).await {
            Ok(Ok(mut evaluation)) if evaluation.confidence.is_finite() => {
                evaluation.confidence = evaluation.confidence.clamp(0.0, 1.0);
                (evaluation, false, enriched)
            }
            Ok(Ok(_)) => {
                warn!(
                    title = subject.title.as_str(),
                    "Scorer returned non-finite confidence, using heuristic"
                );
                (fallback_evaluation(&subject, criteria), true, enriched)
            }
            Ok(Err(e)) => {
                warn!(title = subject.title.as_str(), error = %e, "Scorer failed, using heuristic");
                (fallback_evaluation(&subject, criteria), true, enriched)
            }
            Err(_) => {
                warn!(
                    title = subject.title.as_str(),
                    timeout_secs = self.timeout.as_secs(),
                    "Scorer timed out, using heuristic"
                );
                (fallback_evaluation(&subject, criteria), true, enriched)
            }
        }
    }
}
