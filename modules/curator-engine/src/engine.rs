//! The dispatch loop.

use std::collections::VecDeque;
use std::marker::PhantomData;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::persist::PendingEvent;
use crate::traits::{EventLike, EventPersister, Reducer, Router};

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No handler had anything left to emit.
    Settled { events: usize },
    /// The token fired. Events still queued were dropped unjournaled.
    Cancelled { events: usize },
}

/// Breadth-first event loop for one workflow run.
///
/// Each event is journaled, folded into the state by the reducer and then
/// handed to the router, whose output is queued behind any siblings. The
/// cancellation token is checked before each event, never mid-handler.
pub struct Engine<E, S, D, Red, Rout, P>
where
    E: EventLike,
    S: Send + Sync,
    D: Send + Sync,
    Red: Reducer<E, S>,
    Rout: Router<E, S, D>,
    P: EventPersister,
{
    reducer: Red,
    router: Rout,
    journal: P,
    run_id: String,
    cancel: CancellationToken,
    _phantom: PhantomData<fn() -> (E, S, D)>,
}

impl<E, S, D, Red, Rout, P> Engine<E, S, D, Red, Rout, P>
where
    E: EventLike,
    S: Send + Sync,
    D: Send + Sync,
    Red: Reducer<E, S>,
    Rout: Router<E, S, D>,
    P: EventPersister,
{
    pub fn new(reducer: Red, router: Rout, journal: P, run_id: String) -> Self {
        Self {
            reducer,
            router,
            journal,
            run_id,
            cancel: CancellationToken::new(),
            _phantom: PhantomData,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn journal(&self) -> &P {
        &self.journal
    }

    /// Run `event` and everything it causes to completion.
    ///
    /// A journal or handler error aborts the dispatch. The failing event has
    /// already been reduced at that point.
    pub async fn dispatch(&self, event: E, state: &mut S, deps: &D) -> Result<Dispatch> {
        let mut pending: VecDeque<(E, Option<i64>)> = VecDeque::from([(event, None)]);
        let mut handled = 0usize;

        while let Some((event, parent_seq)) = pending.pop_front() {
            if self.cancel.is_cancelled() {
                warn!(
                    run_id = self.run_id.as_str(),
                    handled,
                    dropped = pending.len() + 1,
                    "Run cancelled between events"
                );
                return Ok(Dispatch::Cancelled { events: handled });
            }

            let stored = self
                .journal
                .append(PendingEvent {
                    event_type: event.event_type_str(),
                    payload: event.to_persist_payload(),
                    run_id: &self.run_id,
                    parent_seq,
                })
                .await?;
            debug!(
                seq = stored.seq,
                parent = ?stored.parent_seq,
                event_type = stored.event_type.as_str(),
                "Event journaled"
            );

            self.reducer.reduce(state, &event);
            handled += 1;

            let emitted = self.router.route(&event, &stored, &*state, deps).await?;
            pending.extend(emitted.into_iter().map(|child| (child, Some(stored.seq))));
        }

        Ok(Dispatch::Settled { events: handled })
    }
}
