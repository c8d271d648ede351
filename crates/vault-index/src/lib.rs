//! Relational index over source files, chunks, and embeddings (C5).

pub mod error;
mod operations;
mod pool;
pub mod schema;

pub use error::{IndexError, Result};
pub use operations::{bytes_to_embedding, embedding_to_bytes, ChunkIndex};
pub use pool::{SqliteConfig, SqlitePool};
