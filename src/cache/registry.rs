//! Store registry abstraction
//!
//! The host environment provides durable named stores; this module defines
//! the interface the agent needs from them so different backends
//! (in-memory, on-disk) can be swapped without touching lifecycle code.

use crate::cache::generation::{GenerationInfo, GenerationTag};
use crate::cache::request::{CacheEntry, CapturedResponse, RequestKey};
use crate::error::GardenResult;
use async_trait::async_trait;
use std::sync::Arc;

/// One generation store: request identity -> captured response
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Tag this store is registered under
    fn tag(&self) -> &GenerationTag;

    /// Write an entry, replacing any entry with the same key
    async fn put(&self, entry: CacheEntry) -> GardenResult<()>;

    /// Look up the response captured for `key`
    async fn lookup(&self, key: &RequestKey) -> GardenResult<Option<CapturedResponse>>;

    /// All keys currently held
    async fn keys(&self) -> GardenResult<Vec<RequestKey>>;

    /// Current metadata
    async fn info(&self) -> GardenResult<GenerationInfo>;

    /// Mark the generation complete once population has finished
    async fn seal(&self) -> GardenResult<()>;

    /// Persist that activation finished for this generation
    async fn mark_activated(&self) -> GardenResult<()>;
}

/// The set of generation stores held by the host environment
#[async_trait]
pub trait StoreRegistry: Send + Sync {
    /// Return the store for `tag`, creating an empty one if needed
    async fn open(&self, tag: &GenerationTag) -> GardenResult<Arc<dyn CacheStore>>;

    /// Return the store for `tag` without creating it
    async fn get(&self, tag: &GenerationTag) -> GardenResult<Option<Arc<dyn CacheStore>>>;

    /// Enumerate every generation in the registry, including foreign ones
    async fn list_tags(&self) -> GardenResult<Vec<GenerationTag>>;

    /// Remove a generation. Returns false if it did not exist.
    async fn delete(&self, tag: &GenerationTag) -> GardenResult<bool>;

    /// Human-readable backend name for display
    fn backend_name(&self) -> &'static str;
}
