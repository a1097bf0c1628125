//! Recommendation curator.
//!
//! Turns a free-text request into a short, diverse list of catalog items by
//! looping discovery, evaluation and criteria widening until enough strong
//! candidates exist or the search budget runs out.

pub mod adaptation;
pub mod budget;
pub mod discovery;
pub mod enrichment;
pub mod evaluation;
pub mod notify;
pub mod offline;
pub mod pipeline;
pub mod selection;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod workflow;

pub use pipeline::state::WorkflowState;
pub use workflow::{Curator, WorkflowDeps, WorkflowOutcome};
