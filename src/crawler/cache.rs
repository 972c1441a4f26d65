//! Content cache for fetched pages
//!
//! The coordinator clears the cache at the end of every pass, so entries
//! only serve repeat fetches within one pass. Nothing is persisted.

use crate::crawler::fetcher::FetchedPage;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Get/put cache of fetched pages keyed by URL
pub trait ContentCache: Send + Sync {
    fn get(&self, url: &str) -> Option<FetchedPage>;

    fn put(&self, url: &str, page: FetchedPage);

    /// Drops every entry
    fn clear(&self);
}

/// In-memory cache, empty at construction
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, FetchedPage>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentCache for MemoryCache {
    fn get(&self, url: &str) -> Option<FetchedPage> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    fn put(&self, url: &str, page: FetchedPage) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), page);
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
