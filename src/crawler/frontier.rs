//! Crawl frontier
//!
//! A FIFO queue of pending package names plus the set of normalized keys
//! already taken from it. Names are appended, never prioritized, so the
//! crawl expands breadth-first. A key is handed out at most once per run;
//! rediscovering it later is a no-op, which is also what makes dependency
//! cycles terminate.

use crate::names::normalize;
use std::collections::{HashSet, VecDeque};

/// Pending package names and the keys already processed
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates a frontier seeded with `names`, in order
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: names.into_iter().map(Into::into).collect(),
            seen: HashSet::new(),
        }
    }

    /// Appends a name unless its key has already been processed
    ///
    /// # Returns
    ///
    /// * `true` - The name was queued
    /// * `false` - The key was already seen (or is empty)
    pub fn push(&mut self, name: &str) -> bool {
        let key = normalize(name);
        if key.is_empty() || self.seen.contains(&key) {
            return false;
        }
        self.queue.push_back(name.to_string());
        true
    }

    /// Takes the next unseen name off the queue and marks it seen
    ///
    /// Names whose key was seen while they waited in the queue are dropped.
    pub fn next_unseen(&mut self) -> Option<String> {
        while let Some(name) = self.queue.pop_front() {
            let key = normalize(&name);
            if self.seen.insert(key) {
                return Some(name);
            }
            tracing::trace!("Already seen {}, skipping", name);
        }
        None
    }

    /// Whether the key of `name` has been processed
    pub fn is_seen(&self, name: &str) -> bool {
        self.seen.contains(&normalize(name))
    }

    /// Normalized keys processed so far
    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Number of names waiting in the queue (including stale duplicates)
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is left to process
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
