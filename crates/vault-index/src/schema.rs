use rusqlite::Connection;

use crate::error::Result;

/// Creates the three tables and their indexes if absent. Idempotent — safe
/// to call on every pool construction.
pub fn apply_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS source_files (
            path          TEXT PRIMARY KEY,
            hash          TEXT NOT NULL,
            file_size     INTEGER NOT NULL,
            chunk_count   INTEGER NOT NULL DEFAULT 0,
            archive_path  TEXT,
            status        TEXT NOT NULL,
            processed_at  TEXT,
            is_synced     INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id              TEXT PRIMARY KEY,
            source_path     TEXT NOT NULL REFERENCES source_files(path) ON DELETE CASCADE,
            source_hash     TEXT NOT NULL,
            chunk_index     INTEGER NOT NULL,
            text            TEXT NOT NULL,
            content_hash    TEXT NOT NULL,
            page_number     INTEGER,
            source_location TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embeddings (
            chunk_id TEXT PRIMARY KEY REFERENCES chunks(id) ON DELETE CASCADE,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source_path ON chunks(source_path);
        CREATE INDEX IF NOT EXISTS idx_chunks_source_hash ON chunks(source_hash);
        CREATE INDEX IF NOT EXISTS idx_source_files_status ON source_files(status);
        CREATE INDEX IF NOT EXISTS idx_source_files_is_synced ON source_files(is_synced);
        "#,
    )?;
    Ok(())
}
