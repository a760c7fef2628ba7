//! Sensor Tower app revenue client
//!
//! Fetches revenue and download estimates for a list of iOS app ids in a single
//! request and maps the response back onto the requested ids.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AppRecord, FetchError, FetchResults, RevenueSource};

/// Base URL for the Sensor Tower iOS apps endpoint
pub const SENSOR_TOWER_API_URL: &str = "https://app.sensortower.com/api/ios/apps";

/// Response from the apps endpoint
#[derive(Debug, Deserialize)]
struct AppsResponse {
    #[serde(default)]
    apps: Vec<AppRecord>,
}

/// Client for the Sensor Tower apps endpoint
#[derive(Debug, Clone)]
pub struct SensorTowerClient {
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl Default for SensorTowerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTowerClient {
    /// Creates a client against the public Sensor Tower endpoint
    pub fn new() -> Self {
        Self::with_base_url(SENSOR_TOWER_API_URL)
    }

    /// Creates a client against a custom endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Creates a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches revenue records for every id in `app_ids` with one request
    ///
    /// Never fails as a whole: every requested id maps to either its record or
    /// the error explaining why it has none. A failed request maps every id to
    /// the same error.
    pub async fn fetch_app_revenue(&self, app_ids: &[String]) -> FetchResults {
        if app_ids.is_empty() {
            return FetchResults::new();
        }

        match self.request(app_ids).await {
            Ok(records) => map_records(app_ids, records),
            Err(error) => {
                warn!(count = app_ids.len(), %error, "Sensor Tower request failed");
                app_ids
                    .iter()
                    .map(|id| (id.clone(), Err(error.clone())))
                    .collect()
            }
        }
    }

    /// Performs the HTTP call and decodes the body
    async fn request(&self, app_ids: &[String]) -> Result<Vec<AppRecord>, FetchError> {
        let joined = app_ids.join(",");
        debug!(url = %self.base_url, app_ids = %joined, "Requesting Sensor Tower apps");

        // Commas stay literal in the query, as the provider expects
        let mut url = Url::parse(&self.base_url).map_err(|e| FetchError::Request(e.to_string()))?;
        url.set_query(Some(&format!("app_ids={}", joined)));

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .json::<AppsResponse>()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(body.apps)
    }
}

#[async_trait]
impl RevenueSource for SensorTowerClient {
    async fn fetch_app_revenue(&self, app_ids: &[String]) -> FetchResults {
        SensorTowerClient::fetch_app_revenue(self, app_ids).await
    }
}

/// Keys returned records by app id and fills in `NotFound` for the rest
fn map_records(app_ids: &[String], records: Vec<AppRecord>) -> FetchResults {
    let requested: HashSet<&str> = app_ids.iter().map(String::as_str).collect();
    let mut results = FetchResults::with_capacity(app_ids.len());

    for record in records {
        match record.app_id() {
            Some(id) if requested.contains(id.as_str()) => {
                results.insert(id, Ok(record));
            }
            Some(id) => debug!(app_id = %id, "Ignoring unrequested app in response"),
            None => debug!("Ignoring app without app_id in response"),
        }
    }

    for id in app_ids {
        results
            .entry(id.clone())
            .or_insert_with(|| Err(FetchError::NotFound(id.clone())));
    }

    results
}
