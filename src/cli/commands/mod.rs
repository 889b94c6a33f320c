//! CLI command implementations

pub mod activate;
pub mod completions;
pub mod config;
pub mod deploy;
pub mod fetch;
pub mod generations;
pub mod install;
pub mod purge;

pub use activate::execute as activate;
pub use completions::execute as completions;
pub use config::execute as config;
pub use deploy::execute as deploy;
pub use fetch::execute as fetch;
pub use generations::execute as generations;
pub use install::execute as install;
pub use purge::execute as purge;

use crate::agent::{Agent, AgentSettings};
use crate::audit::AuditLog;
use crate::cache::{AssetRequest, CapturedResponse, DiskRegistry, GenerationTag, StoreManager};
use crate::config::{Config, ConfigManager};
use crate::error::GardenResult;
use crate::network::{HttpNetwork, Network};
use crate::ui::FetchProgress;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Store manager backed by the on-disk registry and the HTTP origin
pub(crate) fn store_manager(config: &Config) -> GardenResult<StoreManager> {
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(config.origin.timeout()));
    manager_with_network(config, network)
}

/// Store manager whose fetches advance `progress`
pub(crate) fn store_manager_with_progress(
    config: &Config,
    progress: Arc<FetchProgress>,
) -> GardenResult<StoreManager> {
    let inner: Arc<dyn Network> = Arc::new(HttpNetwork::new(config.origin.timeout()));
    manager_with_network(config, Arc::new(ProgressNetwork { inner, progress }))
}

fn manager_with_network(config: &Config, network: Arc<dyn Network>) -> GardenResult<StoreManager> {
    let root = config.store_root(ConfigManager::stores_dir());
    debug!(
        "Using store registry at {} over {} transport",
        root.display(),
        network.name()
    );

    Ok(StoreManager::new(
        Arc::new(DiskRegistry::new(root)),
        network,
        config.origin()?,
    ))
}

/// Network decorator reporting each completed fetch
struct ProgressNetwork {
    inner: Arc<dyn Network>,
    progress: Arc<FetchProgress>,
}

#[async_trait]
impl Network for ProgressNetwork {
    async fn fetch(&self, request: &AssetRequest) -> GardenResult<CapturedResponse> {
        let response = self.inner.fetch(request).await?;
        self.progress.on_fetched(request.url.path(), response.status);
        Ok(response)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// A pending agent for the configured generation
pub(crate) fn agent(config: &Config, manager: StoreManager) -> GardenResult<Agent> {
    agent_for(config, manager, config.generation_tag()?)
}

/// A pending agent for `generation`, with the configured prefix and manifest
pub(crate) fn agent_for(
    config: &Config,
    manager: StoreManager,
    generation: GenerationTag,
) -> GardenResult<Agent> {
    let settings = AgentSettings {
        generation,
        owner_prefix: config.agent.owner_prefix.clone(),
        manifest: config.manifest()?,
    };
    Agent::new(settings, manager, Arc::new(AuditLog::new(config)))
}
