//! Installation phase
//!
//! Opens the generation for the current tag and populates it with the
//! manifest. A generation created by a failed attempt is removed again so it
//! never shows up in the registry.

use crate::cache::{GenerationTag, Manifest, StoreManager};
use crate::error::{GardenError, GardenResult};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a successful installation
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub generation: GenerationTag,
    pub entries: usize,
    /// Whether the generation already existed before this attempt
    pub reinstalled: bool,
}

pub(crate) async fn run(
    manager: &StoreManager,
    tag: &GenerationTag,
    manifest: &Manifest,
) -> GardenResult<InstallReport> {
    let existed = manager.get(tag).await?.is_some();
    let store = manager.open(tag).await?;

    let populated = async {
        let entries = manager.populate(&*store, manifest).await?;
        store.seal().await?;
        Ok::<_, GardenError>(entries)
    }
    .await;

    match populated {
        Ok(entries) => {
            info!("Installed generation {} ({} entries)", tag, entries);
            Ok(InstallReport {
                generation: tag.clone(),
                entries,
                reinstalled: existed,
            })
        }
        Err(e) => {
            if !existed {
                if let Err(rollback) = manager.delete(tag).await {
                    warn!("Failed to roll back generation {}: {}", tag, rollback);
                }
            }
            warn!("Installation of {} failed: {}", tag, e);
            Err(e)
        }
    }
}
