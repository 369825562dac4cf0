// Embeddings module
// Sentence-aware chunking, the embedding provider seam and the process-wide model cache

pub mod cache;
pub mod chunking;


pub use cache::{ModelCache, ModelState};
pub use chunking::{
    ChunkingConfig, Chunks, SentenceChunker, chunk_text, estimate_token_count, split_sentences,
};

/// Maps text to fixed-dimension vectors, one per input, in input order
pub trait EmbeddingProvider: Send + Sync {
    fn model_name(&self) -> &str;

    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Scale `vector` to unit L2 norm in place. A zero vector is left untouched.
#[inline]
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Inner product of two equal-length vectors
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
