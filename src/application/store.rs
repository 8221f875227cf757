//! Capabilities consumed from the object-store collaborator.

use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Deterministic public URL for a storage key.
    fn public_url(&self, path: &str) -> String;

    /// Existence check for an already-built URL.
    async fn head_or_probe(&self, url: &str) -> bool;
}
