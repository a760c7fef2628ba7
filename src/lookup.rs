//! Batch revenue lookup
//!
//! Splits a batch of app ids into cache hits and misses, fetches all misses from
//! the provider in one call, and folds both into one outcome per distinct id.
//! A failure for one id never affects the outcome of another.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheStats, RevenueCache};
use crate::data::{FetchError, Outcome, RevenueSource, Source};

/// Outcomes keyed by app id
pub type Outcomes = BTreeMap<String, Outcome>;

/// Full response for one batch, as presented to tool callers
#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub results: Outcomes,
    pub cache_stats: CacheStats,
    /// RFC 3339 time the report was produced
    pub timestamp: String,
}

/// Resolves batches of app ids against the cache and a revenue provider
pub struct RevenueLookup<S> {
    cache: Arc<RevenueCache>,
    source: S,
}

impl<S: RevenueSource> RevenueLookup<S> {
    pub fn new(cache: Arc<RevenueCache>, source: S) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &RevenueCache {
        &self.cache
    }

    /// Resolves `app_ids` and attaches current cache statistics
    pub async fn lookup(&self, app_ids: &[String]) -> RevenueReport {
        let results = self.resolve_batch(app_ids).await;
        RevenueReport {
            results,
            cache_stats: self.cache.stats(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Returns exactly one outcome per distinct id in `app_ids`
    ///
    /// Duplicates collapse to a single entry. At most one provider call is made,
    /// and none when every id is a fresh cache hit.
    pub async fn resolve_batch(&self, app_ids: &[String]) -> Outcomes {
        let mut results = Outcomes::new();
        let mut seen = HashSet::new();
        let mut missing = Vec::new();

        for app_id in app_ids {
            if !seen.insert(app_id.as_str()) {
                continue;
            }
            match self.cache.get(app_id) {
                Some(record) => {
                    results.insert(app_id.clone(), Outcome::Success(record.summary(Source::Cache)));
                }
                None => missing.push(app_id.clone()),
            }
        }

        debug!(hits = results.len(), misses = missing.len(), "Partitioned batch");

        if missing.is_empty() {
            return results;
        }

        info!(count = missing.len(), "Fetching uncached apps from provider");
        let mut fetched = self.source.fetch_app_revenue(&missing).await;

        for app_id in missing {
            let outcome = match fetched.remove(&app_id) {
                Some(Ok(record)) => {
                    self.cache.set(&app_id, record.clone());
                    Outcome::Success(record.summary(Source::Api))
                }
                Some(Err(error)) => Outcome::error(error.to_string()),
                None => Outcome::error(FetchError::NotFound(app_id.clone()).to_string()),
            };
            results.insert(app_id, outcome);
        }

        results
    }
}
