use anyhow::Result;
use tracing::info;

use curator_common::CatalogItem;

use crate::evaluation::QualityGate;
use crate::notify::{emit, Notification, Stage};
use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::handlers::current_criteria;
use crate::pipeline::state::WorkflowState;
use crate::workflow::WorkflowDeps;

/// Score the current window and apply the quality gate.
pub async fn evaluate(state: &WorkflowState, deps: &WorkflowDeps) -> Result<Vec<WorkflowEvent>> {
    let criteria = current_criteria(state)?;
    let notifier = deps.notifier.as_ref();
    emit(notifier, Notification::StageStarted { stage: Stage::Evaluation }).await;

    let window = state.window();
    let items: Vec<CatalogItem> = window.iter().map(|p| p.item.clone()).collect();
    let report = deps.evaluator().evaluate(&items, criteria).await;

    let gate = QualityGate::from_config(&deps.config.evaluation);
    let verdict = gate.assess(&report.evaluations);
    let accepted = gate.accepted(&report.evaluations);
    let next_offset = state.pagination.offset + window.len();
    info!(
        offset = state.pagination.offset,
        evaluated = report.evaluations.len(),
        high_confidence = verdict.high_confidence_count,
        gate_passed = verdict.passed,
        fallbacks = report.fallbacks,
        "Batch evaluated"
    );

    emit(
        notifier,
        Notification::Progress {
            candidates: state.candidates.len() + accepted.len(),
            required: state.min_candidates,
            evaluated: next_offset,
            discovered: state.total_discovered(),
            attempt: state.attempts.current,
        },
    )
    .await;
    emit(notifier, Notification::StageCompleted { stage: Stage::Evaluation }).await;

    Ok(vec![WorkflowEvent::BatchEvaluated {
        evaluations: report.evaluations,
        accepted,
        high_confidence_count: verdict.high_confidence_count,
        gate_passed: verdict.passed,
        next_offset,
        fallbacks: report.fallbacks,
        enriched: report.enriched,
    }])
}
