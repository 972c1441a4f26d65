//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::classify::Language;
use crate::state::UrlState;
use crate::storage::schema::{initialize_schema, partition_sql, table_exists};
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::{NewProverb, ProverbRecord, VisitRecord};
use crate::ParemiaError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    /// Partitions known to exist, to skip repeated DDL
    partitions: HashSet<Language>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ParemiaError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ParemiaError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        Self::with_connection(conn)
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, ParemiaError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ParemiaError> {
        initialize_schema(&conn)?;

        let mut partitions = HashSet::new();
        for language in Language::all() {
            if table_exists(&conn, language.partition())? {
                partitions.insert(language);
            }
        }

        Ok(Self { conn, partitions })
    }

    fn row_to_visit(row: &rusqlite::Row<'_>) -> rusqlite::Result<VisitRecord> {
        Ok(VisitRecord {
            url: row.get(0)?,
            state: UrlState::from_db_string(&row.get::<_, String>(1)?).unwrap_or(UrlState::Failed),
            error_message: row.get(2)?,
            fragments: row.get(3)?,
            stored: row.get(4)?,
            attempts: row.get(5)?,
            discovered_at: row.get(6)?,
            visited_at: row.get(7)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Visited Set =====

    fn mark_visited(&mut self, visit: &VisitRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO visited_urls
             (url, state, error_message, fragments, stored, attempts, discovered_at, visited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                visit.url,
                visit.state.to_db_string(),
                visit.error_message,
                visit.fragments,
                visit.stored,
                visit.attempts,
                visit.discovered_at,
                visit.visited_at
            ],
        )?;
        Ok(())
    }

    fn is_visited(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM visited_urls WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn load_visited(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM visited_urls")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn get_visit(&self, url: &str) -> StorageResult<Option<VisitRecord>> {
        let visit = self
            .conn
            .query_row(
                "SELECT url, state, error_message, fragments, stored, attempts, discovered_at, visited_at
                 FROM visited_urls WHERE url = ?1",
                params![url],
                Self::row_to_visit,
            )
            .optional()?;
        Ok(visit)
    }

    // ===== Proverb Partitions =====

    fn ensure_partition(&mut self, language: Language) -> StorageResult<()> {
        if self.partitions.contains(&language) {
            return Ok(());
        }

        self.conn.execute_batch(&partition_sql(language))?;
        tracing::info!("Created partition {}", language.partition());
        self.partitions.insert(language);
        Ok(())
    }

    fn insert_proverb(&mut self, proverb: &NewProverb) -> StorageResult<String> {
        self.ensure_partition(proverb.language)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO {} (id, text, source_url, language, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            proverb.language.partition()
        );
        self.conn.execute(
            &sql,
            params![
                id,
                proverb.text,
                proverb.source_url,
                proverb.language.code(),
                now
            ],
        )?;

        Ok(id)
    }

    fn get_proverbs(&self, language: Language) -> StorageResult<Vec<ProverbRecord>> {
        if !self.partitions.contains(&language) {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, text, source_url, created_at FROM {} ORDER BY created_at, rowid",
            language.partition()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let proverbs = stmt
            .query_map([], |row| {
                Ok(ProverbRecord {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    source_url: row.get(2)?,
                    language,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(proverbs)
    }

    fn list_partitions(&self) -> StorageResult<Vec<Language>> {
        let mut languages: Vec<Language> = self.partitions.iter().copied().collect();
        languages.sort();
        Ok(languages)
    }

    // ===== Statistics =====

    fn count_proverbs(&self, language: Language) -> StorageResult<u64> {
        if !self.partitions.contains(&language) {
            return Ok(0);
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", language.partition()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_visited_by_state(&self, state: UrlState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visited_urls WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_visited(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visited_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
