//! Deduplicated, provenance-tagged, size-bounded FIFO of pending links.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use curator_common::{sanitize_url, LinkRef, Provenance, QueuedLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Added,
    /// Already enqueued or processed earlier in the run.
    Seen,
    /// Queue at its ceiling; the link was dropped and not marked seen.
    Full,
}

/// Pending links plus every URL ever admitted in this run.
///
/// A URL is marked seen the moment it is enqueued, so it can never be
/// enqueued or processed twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkQueue {
    pending: VecDeque<QueuedLink>,
    seen: HashSet<String>,
    max_len: usize,
}

impl LinkQueue {
    pub fn new(max_len: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            seen: HashSet::new(),
            max_len,
        }
    }

    /// Enqueue a seed-level link.
    pub fn enqueue(&mut self, link: &LinkRef, provenance: Provenance) -> Enqueue {
        self.admit(link, provenance, 0)
    }

    fn admit(&mut self, link: &LinkRef, provenance: Provenance, depth: u32) -> Enqueue {
        let url = sanitize_url(&link.url);
        if self.seen.contains(&url) {
            return Enqueue::Seen;
        }
        if self.pending.len() >= self.max_len {
            return Enqueue::Full;
        }
        self.seen.insert(url.clone());
        self.pending.push_back(QueuedLink {
            url,
            title: link.title.clone(),
            provenance,
            depth,
        });
        Enqueue::Added
    }

    /// Enqueue many; returns how many were added and how many hit the ceiling.
    pub fn extend<'a>(
        &mut self,
        links: impl IntoIterator<Item = &'a LinkRef>,
        provenance: Provenance,
    ) -> (usize, usize) {
        let mut added = 0;
        let mut dropped = 0;
        for link in links {
            match self.enqueue(link, provenance) {
                Enqueue::Added => added += 1,
                Enqueue::Full => dropped += 1,
                Enqueue::Seen => {}
            }
        }
        (added, dropped)
    }

    /// Enqueue links found on `parent`'s page, one hop deeper.
    pub fn extend_from<'a>(
        &mut self,
        links: impl IntoIterator<Item = &'a LinkRef>,
        parent: &QueuedLink,
    ) -> (usize, usize) {
        let provenance = parent.provenance.child();
        let depth = parent.depth.saturating_add(1);
        let mut added = 0;
        let mut dropped = 0;
        for link in links {
            match self.admit(link, provenance, depth) {
                Enqueue::Added => added += 1,
                Enqueue::Full => dropped += 1,
                Enqueue::Seen => {}
            }
        }
        (added, dropped)
    }

    /// Take up to `n` links from the front.
    pub fn pull(&mut self, n: usize) -> Vec<QueuedLink> {
        let take = n.min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.max_len
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.seen.contains(&sanitize_url(url))
    }

    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn pending(&self) -> impl Iterator<Item = &QueuedLink> {
        self.pending.iter()
    }
}
