//! Agent lifecycle state machine
//!
//! ```text
//! PENDING --install ok--> INSTALLED --activate ok--> ACTIVE --fetch--> ACTIVE
//! PENDING --install fails--> PENDING
//! ```

use crate::error::{GardenError, GardenResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one agent instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Generation not yet populated
    Pending,
    /// Generation populated, waiting for activation
    Installed,
    /// Stale generations purged, intercepting requests
    Active,
}

impl AgentState {
    /// State after a successful installation.
    ///
    /// Reinstalling an installed generation is allowed (host retry); an
    /// active agent never reinstalls.
    pub fn after_install(self) -> GardenResult<Self> {
        match self {
            Self::Pending | Self::Installed => Ok(Self::Installed),
            Self::Active => Err(self.invalid("install")),
        }
    }

    /// State after a successful activation
    pub fn after_activate(self) -> GardenResult<Self> {
        match self {
            Self::Installed | Self::Active => Ok(Self::Active),
            Self::Pending => Err(self.invalid("activate")),
        }
    }

    /// Whether the agent may intercept requests
    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Active)
    }

    fn invalid(self, action: &str) -> GardenError {
        GardenError::InvalidTransition {
            action: action.to_string(),
            state: self.to_string(),
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Installed => write!(f, "installed"),
            Self::Active => write!(f, "active"),
        }
    }
}
