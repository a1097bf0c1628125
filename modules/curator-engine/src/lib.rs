//! Event dispatch engine for curator runs.
//!
//! A run is a chain of events. Each one is journaled, reduced into the run
//! state and routed to the handler that produces the next events. Routers
//! read the state by shared reference, so the reducer is its only writer, and
//! replaying a journal through the reducer rebuilds the state.

pub mod engine;
pub mod persist;
pub mod traits;

pub use engine::{Dispatch, Engine};
pub use persist::{MemoryEventSink, PendingEvent, StoredEvent, SCHEMA_VERSION};
pub use traits::{EventLike, EventPersister, Reducer, Router};
