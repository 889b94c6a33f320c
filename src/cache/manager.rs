//! Cache store manager
//!
//! Creates, populates, enumerates and deletes generations. Population is
//! all-or-nothing: every manifest asset is fetched before anything is
//! written, so a failed asset leaves the store untouched.

use crate::cache::generation::GenerationTag;
use crate::cache::manifest::Manifest;
use crate::cache::registry::{CacheStore, StoreRegistry};
use crate::cache::request::{AssetRequest, CacheEntry};
use crate::error::{GardenError, GardenResult};
use crate::network::{Network, Origin};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Handles generation CRUD and population against one registry
#[derive(Clone)]
pub struct StoreManager {
    registry: Arc<dyn StoreRegistry>,
    network: Arc<dyn Network>,
    origin: Origin,
}

impl StoreManager {
    /// Create a manager over `registry`, fetching from `origin` via `network`
    pub fn new(registry: Arc<dyn StoreRegistry>, network: Arc<dyn Network>, origin: Origin) -> Self {
        Self {
            registry,
            network,
            origin,
        }
    }

    pub fn registry(&self) -> &Arc<dyn StoreRegistry> {
        &self.registry
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Return the store for `tag`, creating it empty if needed
    pub async fn open(&self, tag: &GenerationTag) -> GardenResult<Arc<dyn CacheStore>> {
        self.registry.open(tag).await
    }

    /// Return the store for `tag` if it exists
    pub async fn get(&self, tag: &GenerationTag) -> GardenResult<Option<Arc<dyn CacheStore>>> {
        self.registry.get(tag).await
    }

    /// Fetch every manifest asset and write the entries into `store`.
    ///
    /// Fetches run concurrently. If any fetch fails or answers with a
    /// non-2xx status, nothing is written and `PopulateFailure` is returned.
    /// Returns the number of entries written.
    pub async fn populate(&self, store: &dyn CacheStore, manifest: &Manifest) -> GardenResult<usize> {
        let requests = manifest.requests(&self.origin)?;
        debug!(
            "Populating {} with {} assets from {}",
            store.tag(),
            requests.len(),
            self.origin.base()
        );

        let fetches = requests
            .iter()
            .zip(manifest.assets())
            .map(|(request, asset)| self.fetch_asset(store.tag(), asset, request));
        let entries = try_join_all(fetches).await?;

        let count = entries.len();
        try_join_all(entries.into_iter().map(|entry| store.put(entry))).await?;

        info!("Populated generation {} with {} entries", store.tag(), count);
        Ok(count)
    }

    async fn fetch_asset(
        &self,
        tag: &GenerationTag,
        asset: &str,
        request: &AssetRequest,
    ) -> GardenResult<CacheEntry> {
        let failure = |reason: String| GardenError::PopulateFailure {
            generation: tag.to_string(),
            asset: asset.to_string(),
            reason,
        };

        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| failure(e.to_string()))?;

        if !response.is_ok() {
            return Err(failure(format!("HTTP {}", response.status)));
        }

        debug!("Fetched {} ({} bytes)", asset, response.body.len());
        Ok(CacheEntry::new(request.key(), response))
    }

    /// Enumerate all generations in the registry
    pub async fn list_tags(&self) -> GardenResult<Vec<GenerationTag>> {
        self.registry.list_tags().await
    }

    /// The owned generation that most recently finished activation.
    ///
    /// Hosts that do not live across restarts use this to find which
    /// generation should serve. Generations that were installed but never
    /// activated are not candidates.
    pub async fn active_generation(&self, owner_prefix: &str) -> GardenResult<Option<GenerationTag>> {
        let mut active = None;
        for tag in self.list_tags().await? {
            if !tag.is_owned_by(owner_prefix) {
                continue;
            }
            let Some(store) = self.get(&tag).await? else {
                continue;
            };
            let info = store.info().await?;
            let Some(at) = info.activated_at.filter(|_| info.is_activated()) else {
                continue;
            };
            if active.as_ref().map_or(true, |(_, latest)| at >= *latest) {
                active = Some((tag, at));
            }
        }
        Ok(active.map(|(tag, _)| tag))
    }

    /// Remove a generation; missing tags are a no-op
    pub async fn delete(&self, tag: &GenerationTag) -> GardenResult<bool> {
        let removed = self.registry.delete(tag).await?;
        if removed {
            info!("Deleted generation {}", tag);
        } else {
            debug!("Generation {} already absent", tag);
        }
        Ok(removed)
    }
}
