//! Text extraction (C1) and embedding generation (C2) for vaultkeep.

pub mod embed;
pub mod extract;

pub use embed::MockEmbeddingProvider;
#[cfg(feature = "onnx")]
pub use embed::OnnxEmbeddingProvider;
pub use extract::{default_extractors, PlainTextExtractor};
