//! Journal records and the in-memory journal.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::EventPersister;

/// Current payload layout version.
pub const SCHEMA_VERSION: i16 = 1;

/// An event about to be journaled.
#[derive(Debug, Clone)]
pub struct PendingEvent<'a> {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub run_id: &'a str,
    /// Sequence number of the event whose handler emitted this one.
    pub parent_seq: Option<i64>,
}

/// A journaled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: i64,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub parent_seq: Option<i64>,
    pub run_id: Option<String>,
    pub payload: serde_json::Value,
    pub schema_v: i16,
}

/// Journal held in memory for the lifetime of one run. Sequence numbers
/// start at 1.
pub struct MemoryEventSink {
    next_seq: AtomicI64,
    events: Mutex<Vec<StoredEvent>>,
}

impl Default for MemoryEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicI64::new(1),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Everything appended so far, oldest first.
    pub fn events(&self) -> Vec<StoredEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking writer cannot leave a half-pushed entry, so poison is ignored.
    fn lock(&self) -> MutexGuard<'_, Vec<StoredEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventPersister for MemoryEventSink {
    async fn append(&self, event: PendingEvent<'_>) -> Result<StoredEvent> {
        let stored = StoredEvent {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            ts: Utc::now(),
            event_type: event.event_type,
            parent_seq: event.parent_seq,
            run_id: Some(event.run_id.to_string()),
            payload: event.payload,
            schema_v: SCHEMA_VERSION,
        };
        self.lock().push(stored.clone());
        Ok(stored)
    }
}

/// Lets a caller keep a handle on the journal it gave the engine.
#[async_trait]
impl<P: EventPersister + ?Sized> EventPersister for Arc<P> {
    async fn append(&self, event: PendingEvent<'_>) -> Result<StoredEvent> {
        (**self).append(event).await
    }
}
