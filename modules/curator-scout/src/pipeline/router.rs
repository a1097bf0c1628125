//! Routing: which stage runs after each event.
//!
//! The stage order after an evaluation or discovery round is an ordered
//! transition table over `WorkflowState`; the first matching rule wins.
//! `route` is pure, so the same state always yields the same decision.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use curator_engine::{Router, StoredEvent};

use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::handlers;
use crate::pipeline::state::WorkflowState;
use crate::workflow::WorkflowDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    End,
    Finalize,
    EvaluateNext,
    Discover,
}

pub struct Transition {
    pub name: &'static str,
    pub guard: fn(&WorkflowState) -> bool,
    pub decision: Decision,
}

fn is_completed(state: &WorkflowState) -> bool {
    state.completed || !state.recommendations.is_empty()
}

fn has_enough_candidates(state: &WorkflowState) -> bool {
    state.candidates.len() >= state.min_candidates
}

fn attempts_exhausted(state: &WorkflowState) -> bool {
    state.attempts.exhausted()
}

fn has_unevaluated_items(state: &WorkflowState) -> bool {
    state.pagination.offset < state.total_discovered()
}

fn can_discover_more(state: &WorkflowState) -> bool {
    !state.depth.exhausted() && !state.links.is_empty() && !has_enough_candidates(state)
}

fn always(_: &WorkflowState) -> bool {
    true
}

pub const TRANSITIONS: &[Transition] = &[
    Transition {
        name: "completed",
        guard: is_completed,
        decision: Decision::End,
    },
    Transition {
        name: "enough_candidates",
        guard: has_enough_candidates,
        decision: Decision::Finalize,
    },
    Transition {
        name: "attempts_exhausted",
        guard: attempts_exhausted,
        decision: Decision::Finalize,
    },
    Transition {
        name: "unevaluated_items",
        guard: has_unevaluated_items,
        decision: Decision::EvaluateNext,
    },
    Transition {
        name: "discovery_headroom",
        guard: can_discover_more,
        decision: Decision::Discover,
    },
    Transition {
        name: "nothing_left",
        guard: always,
        decision: Decision::Finalize,
    },
];

/// First matching rule in `TRANSITIONS`.
pub fn matching_rule(state: &WorkflowState) -> &'static Transition {
    TRANSITIONS
        .iter()
        .find(|t| (t.guard)(state))
        .unwrap_or(&TRANSITIONS[TRANSITIONS.len() - 1])
}

pub fn route(state: &WorkflowState) -> Decision {
    matching_rule(state).decision
}

pub struct WorkflowRouter;

#[async_trait]
impl Router<WorkflowEvent, WorkflowState, WorkflowDeps> for WorkflowRouter {
    async fn route(
        &self,
        event: &WorkflowEvent,
        _stored: &StoredEvent,
        state: &WorkflowState,
        deps: &WorkflowDeps,
    ) -> Result<Vec<WorkflowEvent>> {
        match event {
            WorkflowEvent::RunStarted { .. } => handlers::criteria::extract(state, deps).await,
            WorkflowEvent::CriteriaExtracted { .. } => {
                handlers::discovery::discover(state, deps).await
            }
            WorkflowEvent::BatchEvaluated { gate_passed, .. }
                if !gate_passed && !state.attempts.exhausted() =>
            {
                handlers::adaptation::widen(state, deps).await
            }
            WorkflowEvent::ItemsDiscovered { .. }
            | WorkflowEvent::BatchEvaluated { .. }
            | WorkflowEvent::CriteriaWidened { .. } => next_stage(state, deps).await,
            WorkflowEvent::Finalized { .. } | WorkflowEvent::RunFailed { .. } => Ok(vec![]),
        }
    }
}

async fn next_stage(state: &WorkflowState, deps: &WorkflowDeps) -> Result<Vec<WorkflowEvent>> {
    let rule = matching_rule(state);
    debug!(rule = rule.name, decision = ?rule.decision, "Routing");
    match rule.decision {
        Decision::End => Ok(vec![]),
        Decision::Finalize => handlers::finalize::finalize(state, deps).await,
        Decision::EvaluateNext => handlers::evaluation::evaluate(state, deps).await,
        Decision::Discover => handlers::discovery::discover(state, deps).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{evaluation, processed};
    use curator_common::{CuratorConfig, LinkRef, Provenance};

    fn state() -> WorkflowState {
        WorkflowState::new("request", &CuratorConfig::default())
    }

    #[test]
    fn empty_state_finalizes() {
        assert_eq!(route(&state()), Decision::Finalize);
        assert_eq!(matching_rule(&state()).name, "nothing_left");
    }

    #[test]
    fn completed_state_ends() {
        let mut s = state();
        s.completed = true;
        s.candidates = vec![evaluation("A", 0.9); 5];
        assert_eq!(route(&s), Decision::End);
    }

    #[test]
    fn enough_candidates_beats_pending_items() {
        let mut s = state();
        s.processed = (0..20).map(|i| processed(&format!("I{i}"))).collect();
        s.candidates = (0..3).map(|i| evaluation(&format!("C{i}"), 0.9)).collect();
        assert_eq!(route(&s), Decision::Finalize);
    }

    #[test]
    fn exhausted_attempts_finalize_even_with_items_left() {
        let mut s = state();
        s.processed = (0..20).map(|i| processed(&format!("I{i}"))).collect();
        s.attempts.current = s.attempts.max;
        assert_eq!(route(&s), Decision::Finalize);
        assert_eq!(matching_rule(&s).name, "attempts_exhausted");
    }

    #[test]
    fn unevaluated_items_evaluate_next() {
        let mut s = state();
        s.processed = (0..4).map(|i| processed(&format!("I{i}"))).collect();
        assert_eq!(route(&s), Decision::EvaluateNext);
    }

    #[test]
    fn queued_links_with_depth_left_discover() {
        let mut s = state();
        s.depth.current = 1;
        s.links.enqueue(&LinkRef::new("x", "https://catalog.local/x"), Provenance::Initial);
        assert_eq!(route(&s), Decision::Discover);

        s.depth.current = s.depth.max;
        assert_eq!(route(&s), Decision::Finalize);
    }

    #[test]
    fn route_is_pure() {
        let mut s = state();
        s.processed = (0..4).map(|i| processed(&format!("I{i}"))).collect();
        s.candidates = vec![evaluation("C", 0.8)];
        let before = s.clone();
        let first = route(&s);
        for _ in 0..10 {
            assert_eq!(route(&s), first);
        }
        assert_eq!(s, before);
    }
}
