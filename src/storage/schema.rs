//! Database schema definitions
//!
//! The fixed schema holds the visited-set. Proverb partitions are created on
//! demand from [`partition_sql`], one table per language.

use crate::classify::Language;

/// SQL schema for the fixed tables
pub const SCHEMA_SQL: &str = r#"
-- Durable visited-set; rows are never updated or deleted
CREATE TABLE IF NOT EXISTS visited_urls (
    url TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    error_message TEXT,
    fragments INTEGER NOT NULL DEFAULT 0,
    stored INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 1,
    discovered_at TEXT NOT NULL,
    visited_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_visited_state ON visited_urls(state);
"#;

/// Returns the idempotent DDL for one language partition
pub fn partition_sql(language: Language) -> String {
    let table = language.partition();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            source_url TEXT,
            language TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_source ON {table}(source_url);"
    )
}

/// Initializes the fixed schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Checks whether a table exists in the database
pub fn table_exists(conn: &rusqlite::Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
