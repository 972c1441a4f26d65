//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::classify::Language;
use crate::state::UrlState;
use crate::storage::Storage;
use crate::ParemiaError;
use std::collections::HashMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Total number of visited URLs
    pub total_visited: u64,

    /// Visited URLs by final state (states with zero URLs omitted)
    pub visited_by_state: HashMap<UrlState, u64>,

    /// Stored proverbs per existing partition
    pub proverbs_by_language: Vec<(Language, u64)>,
}

impl CrawlStatistics {
    pub fn total_proverbs(&self) -> u64 {
        self.proverbs_by_language.iter().map(|(_, n)| n).sum()
    }

    pub fn visited_in(&self, state: UrlState) -> u64 {
        self.visited_by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(ParemiaError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, ParemiaError> {
    let total_visited = storage.count_visited()?;

    let mut visited_by_state = HashMap::new();
    for state in UrlState::all_states() {
        let count = storage.count_visited_by_state(state)?;
        if count > 0 {
            visited_by_state.insert(state, count);
        }
    }

    let mut proverbs_by_language = Vec::new();
    for language in storage.list_partitions()? {
        proverbs_by_language.push((language, storage.count_proverbs(language)?));
    }

    Ok(CrawlStatistics {
        total_visited,
        visited_by_state,
        proverbs_by_language,
    })
}

/// Renders statistics as a human-readable report
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Crawl Statistics ===\n");
    let _ = writeln!(out, "Visited URLs: {}", stats.total_visited);

    for state in [UrlState::Done, UrlState::Failed] {
        let count = stats.visited_in(state);
        let percentage = if stats.total_visited > 0 {
            (count as f64 / stats.total_visited as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", state, count, percentage);
    }

    let _ = writeln!(out, "\nProverbs: {}", stats.total_proverbs());
    if stats.proverbs_by_language.is_empty() {
        let _ = writeln!(out, "  (no partitions yet)");
    }
    for (language, count) in &stats.proverbs_by_language {
        let _ = writeln!(out, "  {} ({}): {}", language.name(), language.partition(), count);
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
