//! The curator workflow as an event-driven state machine.
//!
//! `WorkflowReducer` owns every state change, `WorkflowRouter` decides what
//! runs next, and the handlers do the I/O.

pub mod events;
pub mod handlers;
pub mod reducer;
pub mod router;
pub mod state;
pub mod stats;

use anyhow::{Context, Result};

use curator_common::CuratorConfig;
use curator_engine::{Reducer, StoredEvent};

use self::events::WorkflowEvent;
use self::reducer::WorkflowReducer;
use self::state::WorkflowState;

/// Rebuild a run's final state from its journal by re-applying every event
/// through the reducer. No handler runs.
pub fn replay(
    request: &str,
    config: &CuratorConfig,
    journal: &[StoredEvent],
) -> Result<WorkflowState> {
    let mut state = WorkflowState::new(request, config);
    for stored in journal {
        let event: WorkflowEvent = serde_json::from_value(stored.payload.clone())
            .with_context(|| format!("Undecodable journal event seq={}", stored.seq))?;
        WorkflowReducer.reduce(&mut state, &event);
    }
    Ok(state)
}
