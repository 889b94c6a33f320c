//! Versioned offline asset cache
//!
//! Holds captured responses for a fixed manifest of static assets, one
//! generation per deployment. Generations are write-once: a changed asset
//! requires a new generation tag and a brand-new store.
//!
//! # Generation States
//!
//! | State | Servable | Description |
//! |-------|----------|-------------|
//! | Building | no | Created, population in progress or interrupted |
//! | Complete | yes | Every manifest asset captured |
//!
//! # Ownership
//!
//! A registry may be shared with unrelated stores. Only generations whose
//! tag carries the configured owner prefix are ever deleted.

pub mod disk;
pub mod generation;
pub mod manager;
pub mod manifest;
pub mod memory;
pub mod registry;
pub mod request;

pub use disk::DiskRegistry;
pub use generation::{GenerationInfo, GenerationState, GenerationTag};
pub use manager::StoreManager;
pub use manifest::Manifest;
pub use memory::MemoryRegistry;
pub use registry::{CacheStore, StoreRegistry};
pub use request::{AssetRequest, CacheEntry, CapturedResponse, RequestKey};
