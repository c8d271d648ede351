//! Similarity-driven semantic chunking (C3): splits text into sentences,
//! embeds them, and groups adjacent sentences into chunks at low-similarity
//! boundaries, subject to min/max size constraints.

pub mod error;
mod options;
mod sentence_split;

pub use error::{ChunkerError, Result};
pub use options::ChunkOptions;

use chrono::Utc;
use vault_core::{Chunk, EmbeddingProvider, Sentence, SourceMetadata};

/// Chunk `text`, calling `embedder` once for all sentence texts. `source_id`
/// and `metadata` are stamped onto every emitted chunk.
pub async fn chunk_text(
    text: &str,
    source_id: &str,
    metadata: SourceMetadata,
    version: &str,
    embedder: &dyn EmbeddingProvider,
    options: &ChunkOptions,
) -> Result<Vec<Chunk>> {
    let sentences = sentence_split::split_sentences(text, &options.delimiters);

    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    if sentences.len() == 1 {
        let created_at = Utc::now();
        return Ok(vec![Chunk::new(
            source_id,
            0,
            text.trim().to_string(),
            Some(0),
            Some(text.len() as i32),
            None,
            None,
            version,
            metadata,
            created_at,
        )]);
    }

    let texts: Vec<String> = sentences.iter().map(|s| s.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let sentences: Vec<Sentence> = sentences
        .into_iter()
        .zip(embeddings.into_iter())
        .map(|(mut s, e)| {
            s.embedding = Some(e);
            s
        })
        .collect();

    let break_points = discover_break_points(&sentences, options.similarity_threshold);

    Ok(assemble_chunks(
        text,
        &sentences,
        &break_points,
        source_id,
        &metadata,
        version,
        options,
    ))
}

/// Candidate break positions: index `i` means a break is candidate *before*
/// sentence `i` (i.e. after sentence `i - 1`).
fn discover_break_points(sentences: &[Sentence], threshold: f32) -> Vec<bool> {
    let mut breaks = vec![false; sentences.len()];
    for i in 0..sentences.len().saturating_sub(1) {
        let a = sentences[i].embedding.as_deref().unwrap_or(&[]);
        let b = sentences[i + 1].embedding.as_deref().unwrap_or(&[]);
        if cosine_similarity(a, b) < threshold {
            breaks[i + 1] = true;
        }
    }
    breaks
}

/// `Σ a_i b_i / (‖a‖·‖b‖)` in 32-bit float. Inputs are not assumed
/// pre-normalized.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn assemble_chunks(
    source_text: &str,
    sentences: &[Sentence],
    break_points: &[bool],
    source_id: &str,
    metadata: &SourceMetadata,
    version: &str,
    options: &ChunkOptions,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut chunk_index = 0i32;
    let mut run_start = 0usize;
    let mut run_len = 0usize;

    for i in 0..sentences.len() {
        run_len += sentences[i].text.len();
        let is_last = i == sentences.len() - 1;
        let next_is_break = !is_last && break_points[i + 1];

        let should_emit =
            run_len >= options.max_chunk_size || (next_is_break && run_len >= options.min_chunk_size) || is_last;

        if should_emit {
            let first = &sentences[run_start];
            let last = &sentences[i];
            let start = first.start_index;
            let end = last.end_index;
            let text = source_text.get(start..end).unwrap_or("").trim();
            let created_at = Utc::now();
            chunks.push(Chunk::new(
                source_id,
                chunk_index,
                text.to_string(),
                Some(start as i32),
                Some(end as i32),
                None,
                None,
                version,
                metadata.clone(),
                created_at,
            ));
            chunk_index += 1;
            run_start = i + 1;
            run_len = 0;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_enrichment::MockEmbeddingProvider;

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let embedder = MockEmbeddingProvider::new(8);
        let chunks = chunk_text(
            "",
            "src-1",
            SourceMetadata::default(),
            "v1",
            &embedder,
            &ChunkOptions::default(),
        )
        .await
        .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn single_sentence_yields_one_chunk_spanning_whole_input() {
        let embedder = MockEmbeddingProvider::new(8);
        let text = "Just one sentence here";
        let chunks = chunk_text(
            text,
            "src-1",
            SourceMetadata::default(),
            "v1",
            &embedder,
            &ChunkOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_index, Some(0));
        assert_eq!(chunks[0].end_index, Some(text.len() as i32));
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[tokio::test]
    async fn below_min_chunk_size_does_not_break_even_with_low_similarity() {
        // Two very short sentences; even if the mock embeddings happen to
        // diverge, min_chunk_size should keep them merged.
        let embedder = MockEmbeddingProvider::new(8);
        let mut options = ChunkOptions::default();
        options.min_chunk_size = 1000;
        options.max_chunk_size = 2000;
        let text = "Hi. Yo.";
        let chunks = chunk_text(
            text,
            "src-1",
            SourceMetadata::default(),
            "v1",
            &embedder,
            &options,
        )
        .await
        .unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
