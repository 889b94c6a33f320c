//! Generation tags and generation metadata
//!
//! Tracks generation state (building, complete) and the naming convention
//! that tells this agent's generations apart from foreign stores sharing
//! the same registry.

use crate::error::{GardenError, GardenResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default tag of the current generation
pub const DEFAULT_GENERATION: &str = "garden-cache-v3";

/// Default prefix marking a generation as owned by this agent
pub const DEFAULT_OWNER_PREFIX: &str = "garden-cache-";

/// Opaque identifier of one version of the cached asset set.
///
/// Compared by exact string equality; no version parsing. Tags double as
/// store names, so path separators and leading dots are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationTag(String);

impl GenerationTag {
    /// Validate and wrap a tag
    pub fn new(tag: impl Into<String>) -> GardenResult<Self> {
        let tag = tag.into();
        let invalid = |reason: &str| {
            Err(GardenError::User(format!(
                "Invalid generation tag '{}': {}",
                tag, reason
            )))
        };

        if tag.is_empty() {
            return invalid("must not be empty");
        }
        if tag.starts_with('.') {
            return invalid("must not start with '.'");
        }
        if tag.contains(['/', '\\']) {
            return invalid("must not contain path separators");
        }
        if tag.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return invalid("must not contain whitespace or control characters");
        }

        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this generation follows the owner naming convention
    pub fn is_owned_by(&self, owner_prefix: &str) -> bool {
        !owner_prefix.is_empty() && self.0.starts_with(owner_prefix)
    }
}

impl fmt::Display for GenerationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GenerationTag {
    type Error = GardenError;

    fn try_from(value: String) -> GardenResult<Self> {
        Self::new(value)
    }
}

impl From<GenerationTag> for String {
    fn from(tag: GenerationTag) -> Self {
        tag.0
    }
}

impl PartialEq<str> for GenerationTag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for GenerationTag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// State of a generation store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    /// Created, population not yet finished (or interrupted)
    Building,
    /// Fully populated, eligible for activation and interception
    Complete,
}

impl GenerationState {
    /// Whether interception may read from this generation
    pub fn is_servable(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building => write!(f, "building"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Metadata describing a generation store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationInfo {
    /// Generation tag (also the store name)
    pub tag: GenerationTag,
    /// Current state
    pub state: GenerationState,
    /// When the store was created
    pub created_at: DateTime<Utc>,
    /// When population finished
    #[serde(default)]
    pub sealed_at: Option<DateTime<Utc>>,
    /// Number of entries held
    #[serde(default)]
    pub entry_count: usize,
    /// When the generation last completed activation
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
}

impl GenerationInfo {
    /// Metadata for a freshly created, empty generation
    pub fn building(tag: GenerationTag) -> Self {
        Self {
            tag,
            state: GenerationState::Building,
            created_at: Utc::now(),
            sealed_at: None,
            entry_count: 0,
            activated_at: None,
        }
    }

    /// Mark the generation as fully populated
    pub fn seal(&mut self, entry_count: usize) {
        self.state = GenerationState::Complete;
        self.sealed_at = Some(Utc::now());
        self.entry_count = entry_count;
    }

    /// Record a finished activation
    pub fn activate(&mut self) {
        self.activated_at = Some(Utc::now());
    }

    /// Complete and activated at least once, so a restarted host may serve
    /// from it
    pub fn is_activated(&self) -> bool {
        self.state.is_servable() && self.activated_at.is_some()
    }
}
