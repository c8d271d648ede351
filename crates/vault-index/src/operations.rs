use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use vault_core::{Chunk, SourceFile, SourceStatus};

use crate::error::{IndexError, Result};
use crate::pool::SqlitePool;

/// Thin facade over `SqlitePool` implementing C5's public contract.
pub struct ChunkIndex<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChunkIndex<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub fn upsert_source_file(&self, record: &SourceFile) -> Result<()> {
        self.pool.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO source_files (path, hash, file_size, chunk_count, archive_path, status, processed_at, is_synced)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(path) DO UPDATE SET
                    hash = excluded.hash,
                    file_size = excluded.file_size,
                    chunk_count = excluded.chunk_count,
                    archive_path = excluded.archive_path,
                    status = excluded.status,
                    processed_at = excluded.processed_at,
                    is_synced = excluded.is_synced
                "#,
                params![
                    record.path,
                    record.hash,
                    record.file_size,
                    record.chunk_count,
                    record.archive_path,
                    record.status.to_string(),
                    record.processed_at.map(|t| t.to_rfc3339()),
                    record.is_synced as i64,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_source_file(&self, path: &str) -> Result<Option<SourceFile>> {
        self.pool.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT path, hash, file_size, chunk_count, archive_path, status, processed_at, is_synced
                     FROM source_files WHERE path = ?1",
                    params![path],
                    |row| {
                        let status_str: String = row.get(5)?;
                        let processed_at: Option<String> = row.get(6)?;
                        Ok(SourceFile {
                            path: row.get(0)?,
                            hash: row.get(1)?,
                            file_size: row.get(2)?,
                            chunk_count: row.get(3)?,
                            archive_path: row.get(4)?,
                            status: parse_status(&status_str),
                            processed_at: processed_at
                                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                                .map(|dt| dt.with_timezone(&Utc)),
                            is_synced: row.get::<_, i64>(7)? != 0,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Transactional per-row upsert on `id`, updating `text`/`content_hash`/`updated_at`.
    pub fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO chunks (id, source_path, source_hash, chunk_index, text, content_hash, page_number, source_location, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                    ON CONFLICT(id) DO UPDATE SET
                        text = excluded.text,
                        content_hash = excluded.content_hash,
                        updated_at = excluded.updated_at
                    "#,
                )?;
                let now = Utc::now().to_rfc3339();
                for chunk in chunks {
                    stmt.execute(params![
                        chunk.id.to_string(),
                        chunk.source_id,
                        chunk.metadata.source_file_hash.clone().unwrap_or_default(),
                        chunk.chunk_index,
                        chunk.text,
                        chunk.content_hash,
                        chunk.page_number,
                        chunk.source_location,
                        now,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn save_embedding(&self, chunk_id: &uuid::Uuid, embedding: &[f32]) -> Result<()> {
        self.save_embeddings_batch(&[(*chunk_id, embedding.to_vec())])
    }

    pub fn save_embeddings_batch(&self, pairs: &[(uuid::Uuid, Vec<f32>)]) -> Result<()> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO embeddings (chunk_id, embedding) VALUES (?1, ?2)
                    ON CONFLICT(chunk_id) DO UPDATE SET embedding = excluded.embedding
                    "#,
                )?;
                for (chunk_id, embedding) in pairs {
                    let bytes = embedding_to_bytes(embedding);
                    stmt.execute(params![chunk_id.to_string(), bytes])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_chunks_by_source_path(&self, path: &str) -> Result<()> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE source_path = ?1)",
                params![path],
            )?;
            tx.execute("DELETE FROM chunks WHERE source_path = ?1", params![path])?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Removes a source file's row along with its chunks/embeddings. Used
    /// when the source itself was deleted, as opposed to `upsert_source_file`
    /// replacing a still-existing source's content.
    pub fn delete_source_file(&self, path: &str) -> Result<()> {
        self.pool.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE source_path = ?1)",
                params![path],
            )?;
            tx.execute("DELETE FROM chunks WHERE source_path = ?1", params![path])?;
            tx.execute("DELETE FROM source_files WHERE path = ?1", params![path])?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_chunks_without_embedding(&self, limit: usize) -> Result<Vec<(uuid::Uuid, String)>> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT chunks.id, chunks.text FROM chunks
                LEFT JOIN embeddings ON chunks.id = embeddings.chunk_id
                WHERE embeddings.chunk_id IS NULL
                LIMIT ?1
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                let id_str: String = row.get(0)?;
                let text: String = row.get(1)?;
                Ok((id_str, text))
            })?;
            let mut out = Vec::new();
            for row in rows {
                let (id_str, text) = row?;
                let id = uuid::Uuid::parse_str(&id_str)
                    .map_err(|_| rusqlite::Error::InvalidColumnType(0, "id".into(), rusqlite::types::Type::Text))?;
                out.push((id, text));
            }
            Ok(out)
        })
    }

    pub fn get_unsynced_source_files(&self, limit: usize) -> Result<Vec<String>> {
        self.pool.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT path FROM source_files WHERE status = 'Completed' AND is_synced = 0 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn mark_source_file_as_synced(&self, path: &str) -> Result<()> {
        self.pool.with_connection(|conn| {
            conn.execute(
                "UPDATE source_files SET is_synced = 1 WHERE path = ?1",
                params![path],
            )?;
            Ok(())
        })
    }

    /// Count of chunks belonging to `path` with no embedding row — used by
    /// the sync worker to decide whether a source can be marked synced.
    pub fn count_unembedded_for_source(&self, path: &str) -> Result<i64> {
        self.pool.with_connection(|conn| {
            let count: i64 = conn.query_row(
                r#"
                SELECT COUNT(*) FROM chunks
                LEFT JOIN embeddings ON chunks.id = embeddings.chunk_id
                WHERE chunks.source_path = ?1 AND embeddings.chunk_id IS NULL
                "#,
                params![path],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn parse_status(s: &str) -> SourceStatus {
    match s {
        "Pending" => SourceStatus::Pending,
        "Processing" => SourceStatus::Processing,
        "Completed" => SourceStatus::Completed,
        "Failed" => SourceStatus::Failed,
        _ => SourceStatus::Pending,
    }
}

/// Raw little-endian float32 payload, length `4 * D`.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Inverse of `embedding_to_bytes`; validates the byte length divides
/// evenly by 4 and, if `expected_dim` is given, matches `4 * expected_dim`.
pub fn bytes_to_embedding(bytes: &[u8], expected_dim: Option<usize>) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(IndexError::EmbeddingLength {
            found: bytes.len(),
            expected: expected_dim.map(|d| d * 4).unwrap_or(bytes.len()),
        });
    }
    if let Some(dim) = expected_dim {
        if bytes.len() != dim * 4 {
            return Err(IndexError::EmbeddingLength {
                found: bytes.len(),
                expected: dim * 4,
            });
        }
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
