//! Seams between the dispatch loop and a workflow.

use anyhow::Result;
use async_trait::async_trait;

use crate::persist::{PendingEvent, StoredEvent};

/// A workflow event: a stable type name plus a JSON form for the journal.
pub trait EventLike: Clone + Send + Sync + 'static {
    /// Namespaced type name, e.g. `workflow:batch_evaluated`.
    fn event_type_str(&self) -> String;

    fn to_persist_payload(&self) -> serde_json::Value;
}

/// Folds one event into the state. The only code allowed to mutate it.
///
/// Must stay free of I/O so a journal can be replayed through it.
pub trait Reducer<E: EventLike, S: Send>: Send + Sync {
    fn reduce(&self, state: &mut S, event: &E);
}

/// Decides what runs after an event and runs it.
///
/// Sees the state only after the event was reduced, and only by shared
/// reference. Whatever it returns is dispatched next, chained to `stored`.
#[async_trait]
pub trait Router<E: EventLike, S: Send + Sync, D: Send + Sync>: Send + Sync {
    async fn route(&self, event: &E, stored: &StoredEvent, state: &S, deps: &D)
        -> Result<Vec<E>>;
}

/// Journal that assigns sequence numbers.
#[async_trait]
pub trait EventPersister: Send + Sync {
    async fn append(&self, event: PendingEvent<'_>) -> Result<StoredEvent>;
}
