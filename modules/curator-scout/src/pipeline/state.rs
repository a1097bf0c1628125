//! Workflow state managed by the reducer.
//!
//! `WorkflowState` is the single record threaded through a run. Handlers read
//! it as a snapshot; only the reducer writes to it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use curator_common::{Criteria, CuratorConfig, Evaluation, ProcessedItem};

use crate::discovery::queue::LinkQueue;
use crate::pipeline::stats::RunStats;

/// Evaluation window over the discovered items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Index of the first item not yet evaluated. Never decreases.
    pub offset: usize,
    pub size: usize,
}

impl Pagination {
    /// End of the current window, clamped to `total`.
    pub fn window_end(&self, total: usize) -> usize {
        self.offset.saturating_add(self.size).min(total)
    }
}

/// A bounded counter (discovery depth, search attempts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounded {
    pub current: u32,
    pub max: u32,
}

impl Bounded {
    pub fn new(max: u32) -> Self {
        Self { current: 0, max }
    }

    pub fn exhausted(&self) -> bool {
        self.current >= self.max
    }

    /// Raise to `value`, never above `max` and never backwards.
    pub fn advance_to(&mut self, value: u32) {
        self.current = self.current.max(value.min(self.max));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub request: String,
    /// Absent until criteria extraction completes.
    pub criteria: Option<Criteria>,
    pub processed: Vec<ProcessedItem>,
    /// Pending links and the run's seen-URL set.
    pub links: LinkQueue,
    pub depth: Bounded,
    pub pagination: Pagination,
    pub last_batch: Vec<Evaluation>,
    /// Append-only within a run.
    pub candidates: Vec<Evaluation>,
    pub min_candidates: usize,
    pub gate_passed: bool,
    pub high_confidence_count: usize,
    pub attempts: Bounded,
    /// Set exactly once, together with `completed`.
    pub recommendations: Vec<Evaluation>,
    pub completed: bool,
    pub last_error: Option<String>,
    pub stats: RunStats,
}

impl WorkflowState {
    pub fn new(request: impl Into<String>, config: &CuratorConfig) -> Self {
        Self {
            request: request.into(),
            criteria: None,
            processed: Vec::new(),
            links: LinkQueue::new(config.discovery.max_queue),
            depth: Bounded::new(config.discovery.max_depth),
            pagination: Pagination {
                offset: 0,
                size: config.discovery.batch_size,
            },
            last_batch: Vec::new(),
            candidates: Vec::new(),
            min_candidates: config.routing.min_candidates,
            gate_passed: false,
            high_confidence_count: 0,
            attempts: Bounded::new(config.routing.max_attempts),
            recommendations: Vec::new(),
            completed: false,
            last_error: None,
            stats: RunStats::default(),
        }
    }

    pub fn seen(&self) -> &HashSet<String> {
        self.links.seen()
    }

    pub fn total_discovered(&self) -> usize {
        self.processed.len()
    }

    /// Items in the current pagination window.
    pub fn window(&self) -> &[ProcessedItem] {
        let end = self.pagination.window_end(self.processed.len());
        let start = self.pagination.offset.min(end);
        &self.processed[start..end]
    }

    pub fn is_terminal(&self) -> bool {
        self.completed || self.last_error.is_some()
    }
}
