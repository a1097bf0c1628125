use anyhow::Result;

use crate::adaptation::adapt;
use crate::notify::{emit, Notification, Stage};
use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::handlers::current_criteria;
use crate::pipeline::state::WorkflowState;
use crate::workflow::WorkflowDeps;

/// Widen the criteria after a failed gate and count the attempt.
pub async fn widen(state: &WorkflowState, deps: &WorkflowDeps) -> Result<Vec<WorkflowEvent>> {
    let criteria = current_criteria(state)?;
    let notifier = deps.notifier.as_ref();
    emit(notifier, Notification::StageStarted { stage: Stage::Adaptation }).await;

    let attempt = state.attempts.current + 1;
    let widened = adapt(criteria, attempt);

    emit(notifier, Notification::StageCompleted { stage: Stage::Adaptation }).await;
    Ok(vec![WorkflowEvent::CriteriaWidened {
        criteria: widened,
        attempt,
    }])
}
