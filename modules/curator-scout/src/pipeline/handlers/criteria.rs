use anyhow::Result;
use tracing::{info, warn};

use curator_common::CuratorError;

use crate::notify::{emit, Notification, Stage};
use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::state::WorkflowState;
use crate::workflow::WorkflowDeps;

/// Interpret the request. Failure here is fatal for the run.
pub async fn extract(state: &WorkflowState, deps: &WorkflowDeps) -> Result<Vec<WorkflowEvent>> {
    let notifier = deps.notifier.as_ref();
    emit(notifier, Notification::StageStarted { stage: Stage::CriteriaExtraction }).await;

    let criteria = match deps.extractor.extract(&state.request).await {
        Ok(criteria) => criteria,
        Err(e) => {
            warn!(error = %e, "Criteria extraction failed");
            return Err(CuratorError::CriteriaExtraction(e.to_string()).into());
        }
    };
    info!(
        targets = ?criteria.target_tags,
        excluded = ?criteria.excluded_tags,
        audience = ?criteria.audience,
        "Criteria extracted"
    );

    emit(notifier, Notification::StageCompleted { stage: Stage::CriteriaExtraction }).await;
    Ok(vec![WorkflowEvent::CriteriaExtracted { criteria }])
}
