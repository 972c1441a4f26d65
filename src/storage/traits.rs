//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::classify::Language;
use crate::state::UrlState;
use crate::storage::{NewProverb, ProverbRecord, VisitRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Covers the durable visited-set and the language-partitioned proverb
/// collections. Proverb records are insert-only.
pub trait Storage {
    // ===== Visited Set =====

    /// Records a URL as visited along with its final pipeline outcome
    ///
    /// The first record for a URL wins; later calls for the same URL are no-ops.
    fn mark_visited(&mut self, visit: &VisitRecord) -> StorageResult<()>;

    /// Returns true if the URL has been recorded as visited
    fn is_visited(&self, url: &str) -> StorageResult<bool>;

    /// Loads every visited URL (used to restore the frontier at startup)
    fn load_visited(&self) -> StorageResult<Vec<String>>;

    /// Gets the visit record for a URL
    fn get_visit(&self, url: &str) -> StorageResult<Option<VisitRecord>>;

    // ===== Proverb Partitions =====

    /// Creates the partition for `language` if it does not exist yet
    fn ensure_partition(&mut self, language: Language) -> StorageResult<()>;

    /// Inserts a proverb into its language partition under a fresh unique id
    ///
    /// # Returns
    ///
    /// The generated record id
    fn insert_proverb(&mut self, proverb: &NewProverb) -> StorageResult<String>;

    /// Gets all proverbs of one partition, oldest first
    fn get_proverbs(&self, language: Language) -> StorageResult<Vec<ProverbRecord>>;

    /// Lists languages whose partition exists
    fn list_partitions(&self) -> StorageResult<Vec<Language>>;

    // ===== Statistics =====

    /// Counts proverbs in one partition (0 if the partition does not exist)
    fn count_proverbs(&self, language: Language) -> StorageResult<u64>;

    /// Counts visited URLs by final state
    fn count_visited_by_state(&self, state: UrlState) -> StorageResult<u64>;

    /// Gets total visited URL count
    fn count_visited(&self) -> StorageResult<u64>;
}
