//! Host environment
//!
//! Plays the role the browser plays for a page's offline agent: it installs
//! newly registered agents, promotes them on activation and routes page
//! requests to whichever agent is active. A new agent only replaces the
//! active one once it is fully installed and activated; until then the old
//! agent keeps serving.

use crate::agent::{ActivationReport, Agent, AgentState, FetchOutcome, InstallReport, ResponseSource};
use crate::cache::{AssetRequest, StoreManager};
use crate::error::{GardenError, GardenResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Registration slots of the host
pub struct Host {
    manager: StoreManager,
    active: RwLock<Option<Arc<Agent>>>,
    waiting: RwLock<Option<Arc<Agent>>>,
}

impl Host {
    pub fn new(manager: StoreManager) -> Self {
        Self {
            manager,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
        }
    }

    /// Currently active agent, if any
    pub async fn active(&self) -> Option<Arc<Agent>> {
        self.active.read().await.clone()
    }

    /// Installed agent waiting for activation, if any
    pub async fn waiting(&self) -> Option<Arc<Agent>> {
        self.waiting.read().await.clone()
    }

    /// Register an agent and run its installation.
    ///
    /// On failure nothing changes: the agent is dropped and any active
    /// agent keeps serving. The host may register again later.
    pub async fn register(&self, agent: Agent) -> GardenResult<InstallReport> {
        let agent = Arc::new(agent);
        let report = agent.on_install().await?;

        info!("Agent for {} installed, waiting for activation", agent.generation());
        *self.waiting.write().await = Some(agent);
        Ok(report)
    }

    /// Activate the waiting agent and make it the one serving requests
    pub async fn activate_waiting(&self) -> GardenResult<ActivationReport> {
        let agent = self
            .waiting
            .write()
            .await
            .take()
            .ok_or_else(|| GardenError::User("No installed agent is waiting for activation".to_string()))?;

        match agent.on_activate().await {
            Ok(report) => {
                info!("Agent for {} is now active", agent.generation());
                *self.active.write().await = Some(agent);
                Ok(report)
            }
            Err(e) => {
                *self.waiting.write().await = Some(agent);
                Err(e)
            }
        }
    }

    /// Install then activate in one step
    pub async fn deploy(&self, agent: Agent) -> GardenResult<(InstallReport, ActivationReport)> {
        let installed = self.register(agent).await?;
        let activated = self.activate_waiting().await?;
        Ok((installed, activated))
    }

    /// Re-attach an agent whose generation was activated by an earlier host
    /// process, making it the active agent without repopulating. Fails for
    /// a generation that was installed but never activated.
    pub async fn resume(&self, agent: Agent) -> GardenResult<()> {
        agent.restore(AgentState::Active).await?;
        *self.active.write().await = Some(Arc::new(agent));
        Ok(())
    }

    /// Route a page request: through the active agent, or straight to the
    /// network when no agent controls the page.
    pub async fn fetch(&self, request: &AssetRequest) -> GardenResult<FetchOutcome> {
        let active = self.active().await;
        match active {
            Some(agent) => agent.on_fetch(request).await,
            None => {
                debug!("No active agent, forwarding {}", request.url);
                let response = self.manager.network().fetch(request).await?;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
        }
    }
}
