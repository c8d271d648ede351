use async_trait::async_trait;
use sha2::{Digest, Sha256};
use vault_core::{EmbeddingProvider, Result};

/// Deterministic, hash-seeded embedding provider for tests. Same text always
/// yields the same vector; vectors are L2-normalized like the reference
/// ONNX implementation so chunker tests exercise the real cosine-similarity
/// code path.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self::new(dimensions)
    }

    fn seed_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions);
        let mut counter: u32 = 0;
        while vector.len() < self.dimensions {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks(4) {
                if vector.len() == self.dimensions {
                    break;
                }
                let mut buf = [0u8; 4];
                buf.copy_from_slice(chunk);
                let raw = u32::from_le_bytes(buf);
                // Map into [-1, 1).
                let value = (raw as f64 / u32::MAX as f64) * 2.0 - 1.0;
                vector.push(value as f32);
            }
            counter += 1;
        }
        l2_normalize(&mut vector);
        vector
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.seed_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.seed_vector(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-deterministic"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_yields_same_vector() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("hello").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn vectors_are_l2_normalized() {
        let provider = MockEmbeddingProvider::new(32);
        let v = provider.embed("anything").await.unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn different_text_yields_different_vector() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("cats").await.unwrap();
        let b = provider.embed("stock market").await.unwrap();
        assert_ne!(a, b);
    }
}
