pub mod mock;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use mock::MockEmbeddingProvider;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbeddingProvider;
