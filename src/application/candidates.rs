//! Ordered candidate URLs for a resource identifier.
//!
//! Generation is pure: the same identifier always yields the same list in the
//! same order. The first entry is the most likely to work because the resolver
//! stops at the first success.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::storage::{
    IdentifierKind, ObjectAddress, StorageLayout, extension_variants, swap_protocol,
};

use super::store::ObjectStore;

pub struct CandidateGenerator {
    store: Arc<dyn ObjectStore>,
    layout: Arc<StorageLayout>,
}

impl CandidateGenerator {
    pub fn new(store: Arc<dyn ObjectStore>, layout: Arc<StorageLayout>) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn generate(&self, identifier: &str) -> Vec<String> {
        let mut list = CandidateList::default();

        match self.layout.classify(identifier) {
            IdentifierKind::Empty => {}
            IdentifierKind::Inline(uri) => list.push(uri),
            IdentifierKind::External(url) => list.push(url),
            IdentifierKind::Public { url, .. } => {
                if url.starts_with("http://") {
                    let upgraded = swap_protocol(&url);
                    list.push(url);
                    list.extend(upgraded);
                } else {
                    list.push(url);
                }
            }
            IdentifierKind::Signed { url, address } => {
                let primary = self.layout.public_url(&address);
                self.push_secondaries(&mut list, &primary, &address);
                list.push(url);
            }
            IdentifierKind::StorageKey { path, address } => {
                let primary = self.store.public_url(&path);
                self.push_secondaries(&mut list, &primary, &address);
                list.push(self.layout.legacy_signed_url(&address));
            }
        }

        list.into_vec()
    }

    /// Primary public URL first, then protocol, host, bucket, and extension
    /// variants, all within the declared layout.
    fn push_secondaries(&self, list: &mut CandidateList, primary: &str, address: &ObjectAddress) {
        list.push(primary.to_string());
        list.extend(swap_protocol(primary));

        for base in self.layout.alternate_bases() {
            list.push(self.layout.public_url(&ObjectAddress {
                base: base.clone(),
                ..address.clone()
            }));
        }

        for bucket in self.layout.alternate_buckets() {
            list.push(self.layout.public_url(&ObjectAddress {
                bucket: bucket.clone(),
                ..address.clone()
            }));
        }

        for key in extension_variants(&address.key) {
            list.push(self.layout.public_url(&ObjectAddress {
                key,
                ..address.clone()
            }));
        }
    }
}

#[derive(Default)]
struct CandidateList {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl CandidateList {
    fn push(&mut self, candidate: String) {
        let candidate = candidate.trim();
        if candidate.is_empty() || self.seen.contains(candidate) {
            return;
        }
        self.seen.insert(candidate.to_string());
        self.items.push(candidate.to_string());
    }

    fn extend<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = String>,
    {
        for candidate in candidates {
            self.push(candidate);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.items
    }
}
