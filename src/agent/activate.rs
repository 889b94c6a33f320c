//! Activation phase
//!
//! Deletes every owned generation except the current one. Deletions run
//! concurrently and activation only completes once all of them settled.
//! The current generation is then marked activated in its metadata.

use crate::cache::{GenerationTag, StoreManager};
use crate::error::{GardenError, GardenResult};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Outcome of a successful activation
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub generation: GenerationTag,
    /// Stale generations removed
    pub deleted: Vec<GenerationTag>,
    /// Foreign generations left in place
    pub skipped: Vec<GenerationTag>,
}

pub(crate) async fn run(
    manager: &StoreManager,
    current: &GenerationTag,
    owner_prefix: &str,
) -> GardenResult<ActivationReport> {
    let store = manager
        .get(current)
        .await?
        .ok_or_else(|| GardenError::GenerationNotInstalled(current.to_string()))?;

    let (stale, skipped): (Vec<GenerationTag>, Vec<GenerationTag>) = manager
        .list_tags()
        .await?
        .into_iter()
        .filter(|tag| tag != current)
        .partition(|tag| tag.is_owned_by(owner_prefix));

    for tag in &skipped {
        debug!("Leaving foreign generation {} in place", tag);
    }

    let results = join_all(stale.iter().map(|tag| manager.delete(tag))).await;

    let mut first_error = None;
    for (tag, result) in stale.iter().zip(results) {
        if let Err(e) = result {
            warn!("Failed to delete stale generation {}: {}", tag, e);
            first_error.get_or_insert(e);
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    store.mark_activated().await?;

    info!(
        "Activated generation {} ({} stale removed)",
        current,
        stale.len()
    );
    Ok(ActivationReport {
        generation: current.clone(),
        deleted: stale,
        skipped,
    })
}
