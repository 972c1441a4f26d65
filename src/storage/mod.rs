//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - The durable visited-set with per-URL outcomes
//! - Lazily created, language-partitioned proverb collections

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::classify::Language;
use crate::state::UrlState;
use crate::ParemiaError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(ParemiaError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ParemiaError> {
    SqliteStorage::new(path)
}

/// A classified fragment on its way into a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProverb {
    pub text: String,
    pub source_url: Option<String>,
    pub language: Language,
}

/// A stored proverb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverbRecord {
    pub id: String,
    pub text: String,
    pub source_url: Option<String>,
    pub language: Language,
    pub created_at: String,
}

/// The final outcome of processing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub url: String,
    pub state: UrlState,
    pub error_message: Option<String>,
    pub fragments: u32,
    pub stored: u32,
    pub attempts: u32,
    pub discovered_at: String,
    pub visited_at: String,
}
