//! Deferred effects on the session's virtual clock.

use chrono::{DateTime, Utc};
use pond_core::{FishId, PelletId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A state change committed some time after the action that caused it.
#[derive(Clone, Debug, PartialEq)]
pub enum Deferred {
    /// Close the net and move the selected fish, if any, into the capture slot.
    ResolveNet { candidate: Option<FishId> },
    /// Delete an eaten or landed pellet.
    RemovePellet(PelletId),
}

#[derive(Debug)]
struct Entry {
    due: DateTime<Utc>,
    seq: u64,
    event: Deferred,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap and the earliest entry must pop first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Queue of deferred events ordered by due time, then insertion order.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Entry>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: DateTime<Utc>, event: Deferred) {
        self.seq += 1;
        self.queue.push(Entry {
            due,
            seq: self.seq,
            event,
        });
    }

    /// Pops the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Deferred> {
        if self.queue.peek()?.due > now {
            return None;
        }
        self.queue.pop().map(|e| e.event)
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.queue.peek().map(|e| e.due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
