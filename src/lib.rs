//! garden-cache - offline asset cache for a digital garden
//!
//! An offline caching agent that installs a versioned generation of static
//! assets, purges stale generations on activation and answers requests from
//! the current generation, falling back to the network on a miss.

pub mod agent;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod network;
pub mod ui;

pub use error::{GardenError, GardenResult};
