use anyhow::Result;

use crate::notify::{emit, Notification, Stage};
use crate::pipeline::events::WorkflowEvent;
use crate::pipeline::handlers::current_criteria;
use crate::pipeline::state::WorkflowState;
use crate::workflow::WorkflowDeps;

/// Run one discovery round and report its delta.
pub async fn discover(state: &WorkflowState, deps: &WorkflowDeps) -> Result<Vec<WorkflowEvent>> {
    let criteria = current_criteria(state)?;
    let notifier = deps.notifier.as_ref();
    emit(notifier, Notification::StageStarted { stage: Stage::Discovery }).await;

    let delta = deps.discovery_loop().discover(state, criteria).await;
    for found in &delta.new_items {
        emit(
            notifier,
            Notification::ItemFound {
                title: found.item.title.clone(),
                source_url: found.source_url.clone(),
            },
        )
        .await;
    }

    emit(notifier, Notification::StageCompleted { stage: Stage::Discovery }).await;
    Ok(vec![WorkflowEvent::ItemsDiscovered {
        items: delta.new_items,
        links: delta.links,
        depth: delta.depth,
        fetched: delta.fetched,
        links_fetched: delta.links_fetched,
        cache_hits: delta.cache_hits,
        fetch_failures: delta.fetch_failures,
        links_dropped: delta.links_dropped,
        truncated: delta.truncated,
    }])
}
