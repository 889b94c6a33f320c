//! Asset manifest
//!
//! The fixed, ordered list of root-relative asset paths a generation must
//! hold. Any deployment that changes a static asset must bump the
//! generation tag and update this list.

use crate::cache::request::AssetRequest;
use crate::error::{GardenError, GardenResult};
use crate::network::Origin;
use std::collections::HashSet;
use tracing::warn;

/// Static assets of the garden page
pub const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/css/style.css",
    "/js/theme.js",
    "/js/seer.js",
    "/js/imagesloaded.js",
    "/js/masonry.js",
    "/js/settings.js",
    "/js/util.js",
    "/js/grid.js",
    "/js/nav.js",
    "/js/wrap.js",
    "/js/add.js",
    "/js/main.js",
    "/js/lightbox.js",
];

/// Ordered, duplicate-free list of asset paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    assets: Vec<String>,
}

impl Manifest {
    /// Build a manifest, rejecting non root-relative paths.
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn new<I, S>(assets: I) -> GardenResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut list = Vec::new();

        for asset in assets {
            let asset = asset.into();
            let trimmed = asset.trim();

            if !trimmed.starts_with('/') || trimmed.starts_with("//") {
                return Err(GardenError::User(format!(
                    "Manifest asset '{}' must be a root-relative path (e.g. /index.html)",
                    asset
                )));
            }

            if seen.insert(trimmed.to_string()) {
                list.push(trimmed.to_string());
            } else {
                warn!("Duplicate manifest asset ignored: {}", trimmed);
            }
        }

        Ok(Self { assets: list })
    }

    /// The garden's built-in static asset list
    pub fn garden_default() -> Self {
        Self {
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Resolve every asset against the origin into GET requests, in order
    pub fn requests(&self, origin: &Origin) -> GardenResult<Vec<AssetRequest>> {
        self.assets
            .iter()
            .map(|asset| origin.resolve(asset).map(AssetRequest::get))
            .collect()
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::garden_default()
    }
}
