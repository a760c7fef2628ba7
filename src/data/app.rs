//! App records returned by the revenue provider
//!
//! The provider's app objects carry dozens of fields we never look at. `AppRecord`
//! keeps the whole JSON object so the cache file round-trips it untouched, and
//! exposes accessors for the handful of fields shown to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single app as returned by the provider, stored verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppRecord {
    fields: Map<String, Value>,
}

impl AppRecord {
    /// Raw access to any provider field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The provider's app id, rendered as a string
    ///
    /// The provider sends numeric ids; string ids are accepted as-is.
    pub fn app_id(&self) -> Option<String> {
        match self.fields.get("app_id")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn humanized_name(&self) -> Option<&str> {
        self.str_field("humanized_name")
    }

    pub fn publisher_name(&self) -> Option<&str> {
        self.str_field("publisher_name")
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.str_field("bundle_id")
    }

    pub fn version(&self) -> Option<&str> {
        self.str_field("version")
    }

    pub fn updated_date(&self) -> Option<&str> {
        self.str_field("updated_date")
    }

    pub fn rating(&self) -> Option<f64> {
        self.fields.get("rating").and_then(Value::as_f64)
    }

    /// Human-readable last-month worldwide revenue, e.g. "$40M"
    pub fn last_month_revenue(&self) -> Option<&str> {
        self.humanized_string("humanized_worldwide_last_month_revenue")
    }

    /// Human-readable last-month worldwide downloads, e.g. "3M"
    pub fn last_month_downloads(&self) -> Option<&str> {
        self.humanized_string("humanized_worldwide_last_month_downloads")
    }

    /// Builds the display view shown to callers
    pub fn summary(&self, source: Source) -> AppSummary {
        AppSummary {
            source,
            app_name: self.humanized_name().map(str::to_string),
            publisher: self.publisher_name().map(str::to_string),
            last_month_revenue: self.last_month_revenue().map(str::to_string),
            last_month_downloads: self.last_month_downloads().map(str::to_string),
            bundle_id: self.bundle_id().map(str::to_string),
            version: self.version().map(str::to_string),
            rating: self.rating(),
            last_updated: self.updated_date().map(str::to_string),
        }
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Reads the `string` member of one of the provider's humanized objects
    fn humanized_string(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.get("string"))
            .and_then(Value::as_str)
    }
}

/// Where an outcome's data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Served from the local cache
    Cache,
    /// Fetched from the provider during this request
    Api,
}

/// Display subset of an `AppRecord`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSummary {
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_month_revenue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_month_downloads: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Per-identifier result of a batch lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Success(AppSummary),
    Error { error: String },
}

impl Outcome {
    pub fn error(message: impl Into<String>) -> Self {
        Outcome::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }

    /// The data source for successful outcomes
    pub fn source(&self) -> Option<Source> {
        match self {
            Outcome::Success(summary) => Some(summary.source),
            Outcome::Error { .. } => None,
        }
    }
}
