//! Interception phase
//!
//! Answers a request from the current generation on a hit; forwards it to
//! the network on a miss. Network responses are never written back.

use crate::cache::{AssetRequest, CapturedResponse, GenerationTag, StoreManager};
use crate::error::GardenResult;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Served from the current generation
    Cache,
    /// Forwarded to the network
    Network,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Response handed back to the requester
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: CapturedResponse,
    pub source: ResponseSource,
}

impl FetchOutcome {
    pub fn is_hit(&self) -> bool {
        self.source == ResponseSource::Cache
    }
}

pub(crate) async fn run(
    manager: &StoreManager,
    current: &GenerationTag,
    request: &AssetRequest,
) -> GardenResult<FetchOutcome> {
    let key = request.key();

    let cached = if key.is_get() {
        match manager.get(current).await? {
            Some(store) => store.lookup(&key).await?,
            None => None,
        }
    } else {
        None
    };

    match cached {
        Some(response) => {
            debug!("Cache hit: {}", key);
            Ok(FetchOutcome {
                response,
                source: ResponseSource::Cache,
            })
        }
        None => {
            debug!("Cache miss: {}", key);
            let response = manager.network().fetch(request).await?;
            Ok(FetchOutcome {
                response,
                source: ResponseSource::Network,
            })
        }
    }
}
