//! Crawl frontier: pending queue plus visited-set
//!
//! Every mutation goes through one mutex so that two workers can never claim
//! the same URL and no enqueue is lost. URL identity is the normalized URL.

use crate::url::{normalize_url, NormalizeOptions};
use crate::UrlError;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// A URL handed out by the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierUrl {
    /// Normalized URL
    pub url: Url,

    /// When the URL first entered the frontier
    pub discovered_at: DateTime<Utc>,
}

impl FrontierUrl {
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    /// URLs waiting to be dispatched, in arrival order
    pending: VecDeque<FrontierUrl>,

    /// Keys of everything in `pending`
    queued: HashSet<String>,

    /// Keys handed out by `next_batch` and not yet visited or released
    dispatched: HashSet<String>,

    /// Keys that must never be enqueued again
    visited: HashSet<String>,

    /// Failed attempts per key (only used when failed URLs are released)
    attempts: HashMap<String, u32>,
}

/// Outcome of an enqueue call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Added,
    AlreadyVisited,
    AlreadyQueued,
}

/// Thread-safe crawl frontier
#[derive(Debug)]
pub struct Frontier {
    options: NormalizeOptions,
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            state: Mutex::new(FrontierState::default()),
        }
    }

    /// Creates a frontier whose visited-set is restored from storage
    pub fn with_visited<I, S>(options: NormalizeOptions, visited: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let frontier = Self::new(options);
        {
            let mut state = frontier.lock();
            for url in visited {
                let key = frontier.key(url.as_ref());
                state.visited.insert(key);
            }
        }
        frontier
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity key for a URL; unparseable input is keyed verbatim
    fn key(&self, url: &str) -> String {
        normalize_url(url, self.options)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    /// Adds a URL unless it is already visited, queued or dispatched
    ///
    /// # Returns
    ///
    /// * `Ok(Enqueued)` - What happened to the URL
    /// * `Err(UrlError)` - The URL could not be normalized
    pub fn enqueue(&self, url: &str) -> Result<Enqueued, UrlError> {
        let normalized = normalize_url(url, self.options)?;
        let key = normalized.to_string();

        let mut state = self.lock();
        if state.visited.contains(&key) {
            return Ok(Enqueued::AlreadyVisited);
        }
        if state.queued.contains(&key) || state.dispatched.contains(&key) {
            return Ok(Enqueued::AlreadyQueued);
        }

        state.queued.insert(key);
        state.pending.push_back(FrontierUrl {
            url: normalized,
            discovered_at: Utc::now(),
        });
        Ok(Enqueued::Added)
    }

    /// Enqueues many URLs, skipping invalid ones
    ///
    /// # Returns
    ///
    /// The number of URLs actually added
    pub fn enqueue_all<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for url in urls {
            match self.enqueue(url.as_ref()) {
                Ok(Enqueued::Added) => added += 1,
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping URL {}: {}", url.as_ref(), e),
            }
        }
        added
    }

    /// Hands out up to `n` pending URLs and marks them dispatched
    ///
    /// Never blocks; returns an empty batch if nothing is pending.
    pub fn next_batch(&self, n: usize) -> Vec<FrontierUrl> {
        let mut state = self.lock();
        let take = n.min(state.pending.len());
        let batch: Vec<FrontierUrl> = state.pending.drain(..take).collect();

        for item in &batch {
            let key = item.url.to_string();
            state.queued.remove(&key);
            state.dispatched.insert(key);
        }

        batch
    }

    /// Records a URL as visited; it can never be enqueued again
    pub fn mark_visited(&self, url: &str) {
        let key = self.key(url);
        let mut state = self.lock();

        state.dispatched.remove(&key);
        if state.queued.remove(&key) {
            state.pending.retain(|item| item.url.as_str() != key);
        }
        state.attempts.remove(&key);
        state.visited.insert(key);
    }

    /// Returns true if the URL has been marked visited
    pub fn is_visited(&self, url: &str) -> bool {
        let key = self.key(url);
        self.lock().visited.contains(&key)
    }

    /// Returns a dispatched URL to the back of the queue after a failed attempt
    ///
    /// # Returns
    ///
    /// The number of failed attempts recorded for the URL so far
    pub fn release(&self, item: FrontierUrl) -> u32 {
        let key = item.url.to_string();
        let mut state = self.lock();

        state.dispatched.remove(&key);
        let attempts = {
            let count = state.attempts.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };

        if !state.visited.contains(&key) && state.queued.insert(key) {
            state.pending.push_back(item);
        }

        attempts
    }

    /// Failed attempts recorded for a URL
    pub fn attempts(&self, url: &str) -> u32 {
        let key = self.key(url);
        self.lock().attempts.get(&key).copied().unwrap_or(0)
    }

    /// Number of URLs waiting to be dispatched
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of URLs in the visited-set
    pub fn visited_len(&self) -> usize {
        self.lock().visited.len()
    }
}
