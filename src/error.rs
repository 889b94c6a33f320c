//! Error types for garden-cache
//!
//! All modules use `GardenResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for garden-cache operations
pub type GardenResult<T> = Result<T, GardenError>;

/// All errors that can occur in garden-cache
#[derive(Error, Debug)]
pub enum GardenError {
    // Lifecycle errors
    #[error("Failed to populate generation {generation}: asset {asset}: {reason}")]
    PopulateFailure {
        generation: String,
        asset: String,
        reason: String,
    },

    #[error("Cache store unavailable during {operation}: {reason}")]
    StoreUnavailable { operation: String, reason: String },

    #[error("Invalid lifecycle transition: cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },

    #[error("Generation {0} is not owned by this agent")]
    ForeignGeneration(String),

    #[error("No generation installed for {0}")]
    GenerationNotInstalled(String),

    // Network errors
    #[error("Network request failed: {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    #[error("Invalid request {target}: {reason}")]
    InvalidRequest { target: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl GardenError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a store-unavailable error for the named operation
    pub fn store(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a network failure error
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::NetworkFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the host may retry the failed phase later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PopulateFailure { .. } | Self::NetworkFailure { .. } | Self::StoreUnavailable { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PopulateFailure { .. } => {
                Some("Check that every manifest asset is served by the origin, then run: garden-cache install")
            }
            Self::GenerationNotInstalled(_) => Some("Run: garden-cache deploy"),
            Self::ConfigInvalid { .. } => Some("Run: garden-cache config show"),
            Self::StoreUnavailable { .. } => Some("Check free space and permissions of the store directory"),
            _ => None,
        }
    }
}
