//! Data models and the remote revenue provider
//!
//! `AppRecord` is the provider's payload, `Outcome` what callers get back per id,
//! and `RevenueSource` the seam between the batch lookup and the network.

pub mod app;
pub mod sensor_tower;

pub use app::{AppRecord, AppSummary, Outcome, Source};
pub use sensor_tower::{SensorTowerClient, SENSOR_TOWER_API_URL};

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Per-identifier result of a provider call
pub type FetchResults = HashMap<String, Result<AppRecord, FetchError>>;

/// Errors reported for an identifier by the revenue provider
///
/// The `Display` text is exactly what callers see in the `error` field.
/// Transport-level failures are cloned onto every id of the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The provider answered 429
    #[error("Rate limited by Sensor Tower API. Please try again later.")]
    RateLimited,

    /// Any other non-success HTTP status
    #[error("API request failed with status {0}")]
    Status(u16),

    /// Network failure or undecodable response body
    #[error("Failed to fetch data from Sensor Tower: {0}")]
    Request(String),

    /// The id was requested but the response did not contain it
    #[error("App ID {0} not found in Sensor Tower response")]
    NotFound(String),
}

/// A bulk provider of app revenue records
///
/// Implementations must return an entry for every requested id, either a record
/// or an error, and must answer an empty request with an empty map without
/// touching the network.
#[async_trait]
pub trait RevenueSource: Send + Sync {
    async fn fetch_app_revenue(&self, app_ids: &[String]) -> FetchResults;
}
