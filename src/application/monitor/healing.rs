//! FIFO of identifiers awaiting repair. An identifier is queued at most once.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::cache::mutex_lock;

const OWNER: &str = "healing_queue";

#[derive(Default)]
struct QueueState {
    order: VecDeque<String>,
    members: HashSet<String>,
}

#[derive(Default)]
pub struct HealingQueue {
    state: Mutex<QueueState>,
}

impl HealingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the identifier was already queued.
    pub fn enqueue(&self, identifier: &str) -> bool {
        let mut state = mutex_lock(&self.state, OWNER, "enqueue");
        if !state.members.insert(identifier.to_string()) {
            return false;
        }
        state.order.push_back(identifier.to_string());
        true
    }

    pub fn pop(&self) -> Option<String> {
        let mut state = mutex_lock(&self.state, OWNER, "pop");
        let next = state.order.pop_front()?;
        state.members.remove(&next);
        Some(next)
    }

    /// Take up to `limit` identifiers in queue order.
    pub fn drain(&self, limit: usize) -> Vec<String> {
        let mut state = mutex_lock(&self.state, OWNER, "drain");
        let take = limit.min(state.order.len());
        let batch: Vec<String> = state.order.drain(..take).collect();
        for identifier in &batch {
            state.members.remove(identifier);
        }
        batch
    }

    pub fn remove(&self, identifier: &str) -> bool {
        let mut state = mutex_lock(&self.state, OWNER, "remove");
        if !state.members.remove(identifier) {
            return false;
        }
        state.order.retain(|queued| queued != identifier);
        true
    }

    pub fn contains(&self, identifier: &str) -> bool {
        mutex_lock(&self.state, OWNER, "contains")
            .members
            .contains(identifier)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, OWNER, "len").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
