//! Pure state updates for the curator workflow.
//!
//! The reducer sees every event and merges its delta into `WorkflowState`.
//! No I/O, no side effects. Once the run is completed nothing else changes.

use curator_engine::Reducer;

use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::state::WorkflowState;

pub struct WorkflowReducer;

impl Reducer<WorkflowEvent, WorkflowState> for WorkflowReducer {
    fn reduce(&self, state: &mut WorkflowState, event: &WorkflowEvent) {
        if state.completed {
            return;
        }

        match event {
            WorkflowEvent::RunStarted { request } => {
                state.request = request.clone();
            }

            WorkflowEvent::CriteriaExtracted { criteria } => {
                state.criteria = Some(criteria.clone());
            }

            WorkflowEvent::ItemsDiscovered {
                items,
                links,
                depth,
                fetched,
                links_fetched,
                cache_hits,
                fetch_failures,
                links_dropped,
                truncated,
            } => {
                state.processed.extend(items.iter().cloned());
                state.links = links.clone();
                state.depth.advance_to(*depth);

                if *fetched {
                    state.stats.discovery_rounds += 1;
                }
                state.stats.items_discovered += items.len() as u32;
                state.stats.links_fetched += links_fetched;
                state.stats.cache_hits += cache_hits;
                state.stats.fetch_failures += fetch_failures;
                state.stats.links_dropped += links_dropped;
                if truncated.is_some() {
                    state.stats.guardrail_hits += 1;
                }
            }

            WorkflowEvent::BatchEvaluated {
                evaluations,
                accepted,
                high_confidence_count,
                gate_passed,
                next_offset,
                fallbacks,
                enriched,
            } => {
                state.last_batch = evaluations.clone();
                state.candidates.extend(accepted.iter().cloned());
                state.high_confidence_count = *high_confidence_count;
                state.gate_passed = *gate_passed;
                state.pagination.offset = state.pagination.offset.max(*next_offset);

                state.stats.batches_evaluated += 1;
                state.stats.items_evaluated += evaluations.len() as u32;
                state.stats.fallback_scores += fallbacks;
                state.stats.enriched_items += enriched;
                state.stats.candidates_accepted += accepted.len() as u32;
            }

            WorkflowEvent::CriteriaWidened { criteria, attempt } => {
                state.criteria = Some(criteria.clone());
                state.attempts.advance_to(*attempt);
                state.stats.criteria_widenings += 1;
            }

            WorkflowEvent::Finalized { recommendations } => {
                state.recommendations = recommendations.clone();
                state.completed = true;
            }

            WorkflowEvent::RunFailed { error } => {
                state.last_error = Some(error.clone());
            }
        }
    }
}
