//! In-memory store registry
//!
//! Process-local registry used for embedding and tests. Stores live as long
//! as the registry value.

use crate::cache::generation::{GenerationInfo, GenerationTag};
use crate::cache::registry::{CacheStore, StoreRegistry};
use crate::cache::request::{CacheEntry, CapturedResponse, RequestKey};
use crate::error::GardenResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A generation held in memory
pub struct MemoryStore {
    tag: GenerationTag,
    info: RwLock<GenerationInfo>,
    entries: RwLock<BTreeMap<RequestKey, CapturedResponse>>,
}

impl MemoryStore {
    fn new(tag: GenerationTag) -> Self {
        Self {
            info: RwLock::new(GenerationInfo::building(tag.clone())),
            tag,
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn tag(&self) -> &GenerationTag {
        &self.tag
    }

    async fn put(&self, entry: CacheEntry) -> GardenResult<()> {
        self.entries.write().await.insert(entry.key, entry.response);
        Ok(())
    }

    async fn lookup(&self, key: &RequestKey) -> GardenResult<Option<CapturedResponse>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn keys(&self) -> GardenResult<Vec<RequestKey>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn info(&self) -> GardenResult<GenerationInfo> {
        let mut info = self.info.read().await.clone();
        info.entry_count = self.entries.read().await.len();
        Ok(info)
    }

    async fn seal(&self) -> GardenResult<()> {
        let count = self.entries.read().await.len();
        self.info.write().await.seal(count);
        Ok(())
    }

    async fn mark_activated(&self) -> GardenResult<()> {
        self.info.write().await.activate();
        Ok(())
    }
}

/// Registry keeping every generation in a map
#[derive(Default)]
pub struct MemoryRegistry {
    stores: RwLock<BTreeMap<GenerationTag, Arc<MemoryStore>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreRegistry for MemoryRegistry {
    async fn open(&self, tag: &GenerationTag) -> GardenResult<Arc<dyn CacheStore>> {
        let mut stores = self.stores.write().await;
        let store = stores
            .entry(tag.clone())
            .or_insert_with(|| {
                debug!("Creating in-memory generation {}", tag);
                Arc::new(MemoryStore::new(tag.clone()))
            })
            .clone();
        Ok(store)
    }

    async fn get(&self, tag: &GenerationTag) -> GardenResult<Option<Arc<dyn CacheStore>>> {
        let stores = self.stores.read().await;
        Ok(stores
            .get(tag)
            .map(|store| Arc::clone(store) as Arc<dyn CacheStore>))
    }

    async fn list_tags(&self) -> GardenResult<Vec<GenerationTag>> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }

    async fn delete(&self, tag: &GenerationTag) -> GardenResult<bool> {
        Ok(self.stores.write().await.remove(tag).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
