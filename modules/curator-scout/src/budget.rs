use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

/// Per-run call budget for an optional collaborator.
pub trait RateLimiter: Send + Sync {
    /// Consume one call if any remain. Never blocks.
    fn can_call(&self) -> bool;

    /// Restore the full budget.
    fn reset(&self);

    fn remaining(&self) -> u32;
}

/// Atomic call counter capped at `max_calls`.
/// Thread-safe for concurrent evaluation; no locking.
pub struct CallBudget {
    max_calls: u32,
    used: AtomicU32,
}

impl CallBudget {
    pub fn new(max_calls: u32) -> Self {
        Self {
            max_calls,
            used: AtomicU32::new(0),
        }
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Relaxed)
    }
}

impl RateLimiter for CallBudget {
    fn can_call(&self) -> bool {
        let granted = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.max_calls).then_some(used + 1)
            })
            .is_ok();
        if !granted {
            debug!(limit = self.max_calls, "Enrichment budget exhausted");
        }
        granted
    }

    fn reset(&self) {
        self.used.store(0, Ordering::Release);
    }

    fn remaining(&self) -> u32 {
        self.max_calls.saturating_sub(self.used.load(Ordering::Acquire))
    }
}
