//! Offline caching agent
//!
//! One agent instance owns one generation tag. The host drives it through
//! three entry points, each awaited to completion:
//!
//! - [`Agent::on_install`]: populate the generation (PENDING -> INSTALLED)
//! - [`Agent::on_activate`]: purge stale generations (INSTALLED -> ACTIVE)
//! - [`Agent::on_fetch`]: answer a request from cache or network (ACTIVE)
//!
//! The registry and the tag are explicit inputs; nothing is ambient.

mod activate;
mod install;
mod intercept;
pub mod state;

pub use activate::ActivationReport;
pub use install::InstallReport;
pub use intercept::{FetchOutcome, ResponseSource};
pub use state::AgentState;

use crate::audit::AuditLog;
use crate::cache::{AssetRequest, GenerationTag, Manifest, StoreManager};
use crate::error::{GardenError, GardenResult};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Events the host environment delivers to an agent
#[derive(Debug, Clone)]
pub enum HostEvent {
    Install,
    Activate,
    Fetch(AssetRequest),
}

/// Result of handling a [`HostEvent`]
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivationReport),
    Responded(FetchOutcome),
}

/// Static settings of one agent instance
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Tag of the generation this agent owns
    pub generation: GenerationTag,
    /// Prefix identifying generations this agent may delete
    pub owner_prefix: String,
    /// Assets every generation must hold
    pub manifest: Manifest,
}

/// The offline caching agent
pub struct Agent {
    settings: AgentSettings,
    manager: StoreManager,
    state: RwLock<AgentState>,
    // Serialises install/activate/restore; interception only takes `state` briefly
    phase: Mutex<()>,
    audit: Arc<AuditLog>,
}

impl Agent {
    /// Create a pending agent.
    ///
    /// Fails if the generation tag does not follow the owner naming
    /// convention, since activation could then never recognise it.
    pub fn new(settings: AgentSettings, manager: StoreManager, audit: Arc<AuditLog>) -> GardenResult<Self> {
        if !settings.generation.is_owned_by(&settings.owner_prefix) {
            return Err(GardenError::ForeignGeneration(settings.generation.to_string()));
        }

        Ok(Self {
            settings,
            manager,
            state: RwLock::new(AgentState::Pending),
            phase: Mutex::new(()),
            audit,
        })
    }

    pub fn generation(&self) -> &GenerationTag {
        &self.settings.generation
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn manager(&self) -> &StoreManager {
        &self.manager
    }

    pub async fn state(&self) -> AgentState {
        *self.state.read().await
    }

    /// Installation entry point
    pub async fn on_install(&self) -> GardenResult<InstallReport> {
        let _phase = self.phase.lock().await;
        let next = self.state().await.after_install()?;

        match install::run(&self.manager, &self.settings.generation, &self.settings.manifest).await {
            Ok(report) => {
                *self.state.write().await = next;
                self.audit
                    .log(
                        "generation.installed",
                        &serde_json::json!({
                            "generation": report.generation.as_str(),
                            "entries": report.entries,
                            "reinstalled": report.reinstalled,
                        }),
                    )
                    .await;
                Ok(report)
            }
            Err(e) => {
                self.audit
                    .log(
                        "generation.install_failed",
                        &serde_json::json!({
                            "generation": self.settings.generation.as_str(),
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Activation entry point
    pub async fn on_activate(&self) -> GardenResult<ActivationReport> {
        let _phase = self.phase.lock().await;
        let next = self.state().await.after_activate()?;

        let report = activate::run(
            &self.manager,
            &self.settings.generation,
            &self.settings.owner_prefix,
        )
        .await?;
        *self.state.write().await = next;

        for tag in &report.deleted {
            self.audit
                .log(
                    "generation.deleted",
                    &serde_json::json!({ "generation": tag.as_str() }),
                )
                .await;
        }
        self.audit
            .log(
                "generation.activated",
                &serde_json::json!({
                    "generation": report.generation.as_str(),
                    "deleted": report.deleted.len(),
                }),
            )
            .await;

        Ok(report)
    }

    /// Interception entry point
    pub async fn on_fetch(&self, request: &AssetRequest) -> GardenResult<FetchOutcome> {
        let state = self.state().await;
        if !state.is_serving() {
            return Err(GardenError::InvalidTransition {
                action: "intercept".to_string(),
                state: state.to_string(),
            });
        }

        intercept::run(&self.manager, &self.settings.generation, request).await
    }

    /// Deliver a host event to the matching entry point
    pub async fn handle(&self, event: HostEvent) -> GardenResult<EventOutcome> {
        match event {
            HostEvent::Install => self.on_install().await.map(EventOutcome::Installed),
            HostEvent::Activate => self.on_activate().await.map(EventOutcome::Activated),
            HostEvent::Fetch(request) => self.on_fetch(&request).await.map(EventOutcome::Responded),
        }
    }

    /// Restore lifecycle state from a previously populated generation.
    ///
    /// Used by hosts that persist registration across restarts. A complete
    /// generation restores to `Installed`; restoring to `Active` also needs
    /// a generation whose activation finished, so a generation that was only
    /// installed never serves.
    pub async fn restore(&self, target: AgentState) -> GardenResult<AgentState> {
        let _phase = self.phase.lock().await;
        let tag = &self.settings.generation;
        let store = self
            .manager
            .get(tag)
            .await?
            .ok_or_else(|| GardenError::GenerationNotInstalled(tag.to_string()))?;

        let info = store.info().await?;
        if !info.state.is_servable() {
            return Err(GardenError::GenerationNotInstalled(tag.to_string()));
        }
        if target.is_serving() && !info.is_activated() {
            return Err(GardenError::InvalidTransition {
                action: "serve".to_string(),
                state: AgentState::Installed.to_string(),
            });
        }

        *self.state.write().await = target;
        debug!("Restored agent for {} as {}", tag, target);
        Ok(target)
    }
}
