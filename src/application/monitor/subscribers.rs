//! Per-identifier snapshot listeners.
//!
//! A [`Subscription`] removes its listener when dropped or when
//! [`Subscription::unsubscribe`] is called, whichever comes first. Lists that
//! become empty are removed so the registry does not grow with churn.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::domain::HealthSnapshot;

pub type SnapshotListener = Arc<dyn Fn(HealthSnapshot) + Send + Sync>;

#[derive(Default)]
pub struct SubscriberRegistry {
    next_token: AtomicU64,
    listeners: DashMap<String, Vec<(u64, SnapshotListener)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        self: &Arc<Self>,
        identifier: &str,
        listener: SnapshotListener,
    ) -> Subscription {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(identifier.to_string())
            .or_default()
            .push((token, listener));

        Subscription {
            registry: Arc::downgrade(self),
            identifier: identifier.to_string(),
            token,
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `snapshot` to every listener of its identifier. Listeners run
    /// outside the registry lock, so they may subscribe or unsubscribe.
    pub fn publish(&self, snapshot: &HealthSnapshot) {
        let listeners: Vec<SnapshotListener> = match self.listeners.get(&snapshot.identifier) {
            Some(entry) => entry.iter().map(|(_, listener)| listener.clone()).collect(),
            None => return,
        };
        for listener in listeners {
            listener(snapshot.clone());
        }
    }

    pub fn listener_count(&self, identifier: &str) -> usize {
        self.listeners
            .get(identifier)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    pub fn identifier_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drop every listener of `identifier`.
    pub fn clear(&self, identifier: &str) {
        self.listeners.remove(identifier);
    }

    fn remove(&self, identifier: &str, token: u64) {
        if let Some(mut entry) = self.listeners.get_mut(identifier) {
            entry.retain(|(existing, _)| *existing != token);
        }
        self.listeners
            .remove_if(identifier, |_, listeners| listeners.is_empty());
    }
}

#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    identifier: String,
    token: u64,
    active: AtomicBool,
}

impl Subscription {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.identifier, self.token);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
