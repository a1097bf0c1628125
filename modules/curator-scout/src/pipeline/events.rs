//! Workflow event types for the engine dispatch loop.
//!
//! Each event is the delta one stage produced. The reducer merges it into
//! `WorkflowState`; the router decides which stage runs next.

use serde::{Deserialize, Serialize};

use curator_common::{Criteria, Evaluation, ProcessedItem};
use curator_engine::EventLike;

use crate::discovery::queue::LinkQueue;
use crate::discovery::Guardrail;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    RunStarted {
        request: String,
    },
    CriteriaExtracted {
        criteria: Criteria,
    },
    ItemsDiscovered {
        items: Vec<ProcessedItem>,
        /// Queue and seen set after the round.
        links: LinkQueue,
        depth: u32,
        /// False when the window was served from already-discovered items.
        fetched: bool,
        links_fetched: u32,
        cache_hits: u32,
        fetch_failures: u32,
        links_dropped: u32,
        truncated: Option<Guardrail>,
    },
    BatchEvaluated {
        evaluations: Vec<Evaluation>,
        /// Subset of `evaluations` at or above the high-confidence threshold.
        accepted: Vec<Evaluation>,
        high_confidence_count: usize,
        gate_passed: bool,
        next_offset: usize,
        fallbacks: u32,
        enriched: u32,
    },
    CriteriaWidened {
        criteria: Criteria,
        attempt: u32,
    },
    Finalized {
        recommendations: Vec<Evaluation>,
    },
    /// Error-terminal. Applied by the driver, never routed.
    RunFailed {
        error: String,
    },
}

impl WorkflowEvent {
    pub fn variant_name(&self) -> &'static str {
        match self {
            WorkflowEvent::RunStarted { .. } => "run_started",
            WorkflowEvent::CriteriaExtracted { .. } => "criteria_extracted",
            WorkflowEvent::ItemsDiscovered { .. } => "items_discovered",
            WorkflowEvent::BatchEvaluated { .. } => "batch_evaluated",
            WorkflowEvent::CriteriaWidened { .. } => "criteria_widened",
            WorkflowEvent::Finalized { .. } => "finalized",
            WorkflowEvent::RunFailed { .. } => "run_failed",
        }
    }
}

impl EventLike for WorkflowEvent {
    fn event_type_str(&self) -> String {
        format!("workflow:{}", self.variant_name())
    }

    fn to_persist_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "type": self.variant_name(), "serialization_error": e.to_string() })
        })
    }
}
