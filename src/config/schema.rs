//! Configuration schema for garden-cache
//!
//! Configuration is stored at `~/.config/garden-cache/config.toml`

use crate::cache::generation::{DEFAULT_GENERATION, DEFAULT_OWNER_PREFIX};
use crate::cache::manifest::DEFAULT_ASSETS;
use crate::cache::{GenerationTag, Manifest};
use crate::error::{GardenError, GardenResult};
use crate::network::Origin;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Agent identity
    pub agent: AgentConfig,

    /// Where assets are fetched from
    pub origin: OriginConfig,

    /// Where generations are stored
    pub store: StoreConfig,

    /// Assets every generation must hold
    pub manifest: ManifestConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record lifecycle events in the audit log
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Agent identity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Tag of the current generation. Bump on every asset change.
    pub generation: String,

    /// Prefix marking generations owned by this agent
    pub owner_prefix: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATION.to_string(),
            owner_prefix: DEFAULT_OWNER_PREFIX.to_string(),
        }
    }
}

/// Origin server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL manifest paths resolve against
    pub base_url: String,

    /// Per-request network timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl OriginConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Registry root directory (defaults to the state directory)
    pub path: Option<PathBuf>,
}

/// Manifest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Root-relative asset paths, in order
    pub assets: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Parsed generation tag
    pub fn generation_tag(&self) -> GardenResult<GenerationTag> {
        GenerationTag::new(self.agent.generation.clone())
    }

    /// Parsed manifest
    pub fn manifest(&self) -> GardenResult<Manifest> {
        Manifest::new(self.manifest.assets.iter().cloned())
    }

    /// Parsed origin
    pub fn origin(&self) -> GardenResult<Origin> {
        Origin::parse(&self.origin.base_url)
    }

    /// Registry root, falling back to `fallback` when unset
    pub fn store_root(&self, fallback: PathBuf) -> PathBuf {
        self.store.path.clone().unwrap_or(fallback)
    }

    /// Check cross-field constraints; `path` is only used for error messages
    pub fn validate(&self, path: &Path) -> GardenResult<()> {
        let invalid = |reason: String| GardenError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let tag = self.generation_tag().map_err(|e| invalid(e.to_string()))?;
        if !tag.is_owned_by(&self.agent.owner_prefix) {
            return Err(invalid(format!(
                "agent.generation '{}' must start with agent.owner_prefix '{}'",
                tag, self.agent.owner_prefix
            )));
        }

        self.manifest().map_err(|e| invalid(e.to_string()))?;
        self.origin().map_err(|e| invalid(e.to_string()))?;

        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(invalid(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            )));
        }

        if self.origin.timeout_secs == 0 {
            return Err(invalid("origin.timeout_secs must be greater than 0".to_string()));
        }

        Ok(())
    }
}
