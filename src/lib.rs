//! App Store revenue lookups
//!
//! Batches of iOS app ids are answered from a 30-day on-disk cache first, with
//! one Sensor Tower request covering whatever is missing. The modules are exposed
//! here for the binary and for integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod lookup;
pub mod mcp;

pub use cache::{CacheStats, RevenueCache};
pub use data::{AppRecord, FetchError, Outcome, RevenueSource, SensorTowerClient, Source};
pub use lookup::{RevenueLookup, RevenueReport};
