//! Stage handlers.
//!
//! Each handler reads a snapshot of the workflow state, performs I/O via deps,
//! and returns the events that re-enter the dispatch loop. Handlers never
//! mutate state.

pub(crate) mod adaptation;
pub(crate) mod criteria;
pub(crate) mod discovery;
pub(crate) mod evaluation;
pub(crate) mod finalize;

use anyhow::{anyhow, Result};

use curator_common::Criteria;

use crate::pipeline::state::WorkflowState;

fn current_criteria(state: &WorkflowState) -> Result<&Criteria> {
    state
        .criteria
        .as_ref()
        .ok_or_else(|| anyhow!("criteria not extracted yet"))
}
