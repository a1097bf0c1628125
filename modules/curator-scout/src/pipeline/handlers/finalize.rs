use anyhow::Result;
use tracing::info;

use crate::notify::{emit, Notification, Stage};
use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::state::WorkflowState;
use crate::selection::select_with;
use crate::workflow::WorkflowDeps;

/// Choose the recommendations from the accumulated candidates.
pub async fn finalize(state: &WorkflowState, deps: &WorkflowDeps) -> Result<Vec<WorkflowEvent>> {
    let notifier = deps.notifier.as_ref();
    emit(notifier, Notification::StageStarted { stage: Stage::Finalization }).await;

    let recommendations = select_with(&state.candidates, &deps.config.selection);
    info!(
        candidates = state.candidates.len(),
        selected = recommendations.len(),
        attempts = state.attempts.current,
        "Finalized"
    );

    emit(notifier, Notification::StageCompleted { stage: Stage::Finalization }).await;
    emit(
        notifier,
        Notification::FinalResult {
            recommendations: recommendations.clone(),
        },
    )
    .await;
    Ok(vec![WorkflowEvent::Finalized { recommendations }])
}
