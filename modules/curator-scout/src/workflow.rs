//! `Curator`: one request in, ranked recommendations out.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use curator_cache::{CacheStore, MemoryCache};
use curator_common::{CuratorConfig, CuratorError, Evaluation};
use curator_engine::{Dispatch, Engine, MemoryEventSink, Reducer, StoredEvent};

use crate::budget::{CallBudget, RateLimiter};
use crate::discovery::DiscoveryLoop;
use crate::enrichment::GuardedEnricher;
use crate::evaluation::BatchEvaluator;
use crate::notify::{NoopBackend, NotifyBackend};
use crate::offline::DefaultNormalizer;
use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::reducer::WorkflowReducer;
use crate::pipeline::router::WorkflowRouter;
use crate::pipeline::state::WorkflowState;
use crate::pipeline::stats::RunStats;
use crate::traits::{CatalogSource, CriteriaExtractor, Enricher, ItemNormalizer, ItemScorer};

/// Collaborators and configuration shared by every stage of a run.
#[derive(Clone, TypedBuilder)]
pub struct WorkflowDeps {
    pub catalog: Arc<dyn CatalogSource>,
    pub extractor: Arc<dyn CriteriaExtractor>,
    pub scorer: Arc<dyn ItemScorer>,
    #[builder(default)]
    pub config: CuratorConfig,
    #[builder(default = Arc::new(DefaultNormalizer) as Arc<dyn ItemNormalizer>)]
    pub normalizer: Arc<dyn ItemNormalizer>,
    #[builder(default = Arc::new(MemoryCache::new()) as Arc<dyn CacheStore>)]
    pub cache: Arc<dyn CacheStore>,
    #[builder(default)]
    pub enricher: Option<Arc<dyn Enricher>>,
    /// Enrichment budget. Replaced with a full one at the start of every run.
    #[builder(
        setter(skip),
        default = Arc::new(CallBudget::new(config.enrichment.max_calls)) as Arc<dyn RateLimiter>
    )]
    limiter: Arc<dyn RateLimiter>,
    #[builder(default = Arc::new(NoopBackend) as Arc<dyn NotifyBackend>)]
    pub notifier: Arc<dyn NotifyBackend>,
}

impl WorkflowDeps {
    /// A copy for one run with its own full enrichment budget.
    pub fn for_run(&self) -> Self {
        Self {
            limiter: Arc::new(CallBudget::new(self.config.enrichment.max_calls)),
            ..self.clone()
        }
    }

    pub fn discovery_loop(&self) -> DiscoveryLoop {
        DiscoveryLoop::new(
            self.catalog.clone(),
            self.normalizer.clone(),
            self.cache.clone(),
            self.config.discovery.clone(),
        )
    }

    pub fn evaluator(&self) -> BatchEvaluator {
        BatchEvaluator::new(
            self.scorer.clone(),
            GuardedEnricher::new(
                self.enricher.clone(),
                self.limiter.clone(),
                self.config.enrichment.timeout(),
            ),
            self.config.evaluation.score_timeout(),
        )
    }
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub run_id: String,
    pub state: WorkflowState,
    /// Every event of the run, in dispatch order.
    pub journal: Vec<StoredEvent>,
}

impl WorkflowOutcome {
    pub fn recommendations(&self) -> &[Evaluation] {
        &self.state.recommendations
    }

    pub fn stats(&self) -> &RunStats {
        &self.state.stats
    }
}

pub struct Curator {
    deps: WorkflowDeps,
}

impl Curator {
    pub fn new(deps: WorkflowDeps) -> Self {
        Self { deps }
    }

    pub async fn run(&self, request: &str) -> Result<WorkflowOutcome, CuratorError> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run the workflow until it completes, fails, or `cancel` fires.
    /// Cancellation is observed between stages.
    pub async fn run_with_cancel(
        &self,
        request: &str,
        cancel: CancellationToken,
    ) -> Result<WorkflowOutcome, CuratorError> {
        let run_id = Uuid::new_v4().to_string();
        let deps = self.deps.for_run();
        info!(run_id = run_id.as_str(), request, "Curator run started");

        let journal = Arc::new(MemoryEventSink::new());
        let engine = Engine::new(WorkflowReducer, WorkflowRouter, journal.clone(), run_id.clone())
            .with_cancellation(cancel);
        let mut state = WorkflowState::new(request, &deps.config);

        let dispatched = engine
            .dispatch(
                WorkflowEvent::RunStarted {
                    request: request.to_string(),
                },
                &mut state,
                &deps,
            )
            .await;

        let error = match dispatched {
            Ok(Dispatch::Settled { events }) => {
                info!(
                    run_id = run_id.as_str(),
                    events,
                    recommendations = state.recommendations.len(),
                    "Curator run complete"
                );
                info!("{}", state.stats);
                return Ok(WorkflowOutcome {
                    run_id,
                    state,
                    journal: journal.events(),
                });
            }
            Ok(Dispatch::Cancelled { events }) => {
                warn!(run_id = run_id.as_str(), events, "Curator run cancelled");
                CuratorError::Cancelled
            }
            Err(e) => match e.downcast::<CuratorError>() {
                Ok(curator_error) => curator_error,
                Err(other) => CuratorError::Engine(other),
            },
        };

        let reason = match &error {
            CuratorError::Cancelled => "cancelled".to_string(),
            other => other.to_string(),
        };
        WorkflowReducer.reduce(&mut state, &WorkflowEvent::RunFailed { error: reason });
        error!(
            run_id = run_id.as_str(),
            error = state.last_error.as_deref().unwrap_or_default(),
            "Curator run failed"
        );
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, MockCatalog, MockExtractor, MockScorer};
    use curator_common::Criteria;

    #[test]
    fn each_run_gets_its_own_budget() {
        let mut config = test_config();
        config.enrichment.max_calls = 2;
        let deps = WorkflowDeps::builder()
            .catalog(Arc::new(MockCatalog::new()))
            .extractor(Arc::new(MockExtractor::returning(Criteria::default())))
            .scorer(Arc::new(MockScorer::new()))
            .config(config)
            .build();

        let first = deps.for_run();
        let second = deps.for_run();
        assert!(first.limiter.can_call());
        assert!(first.limiter.can_call());
        assert!(!first.limiter.can_call());

        assert_eq!(first.limiter.remaining(), 0);
        assert_eq!(second.limiter.remaining(), 2);
        assert_eq!(deps.for_run().limiter.remaining(), 2);
    }
}
