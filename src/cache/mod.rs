//! Cache module for storing provider records on disk
//!
//! This module provides a revenue cache that keeps every fetched app record in
//! memory and mirrors the whole map to a single JSON file. Records expire after a
//! fixed 30-day window, checked when they are read.

mod manager;

pub use manager::{
    expiration_window_ms, now_ms, CacheEntry, CacheError, CacheStats, RevenueCache,
    CACHE_EXPIRATION_DAYS, CACHE_FILE_NAME,
};
