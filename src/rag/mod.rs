// Retrieval-augmented answering
// Chunk, embed and persist documents; retrieve, rerank and generate grounded answers

pub mod confidence;
pub mod prompt;


use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::database::{Chunk, IndexStore};
use crate::embeddings::{ChunkingConfig, EmbeddingProvider, chunk_text, normalize_l2};
use crate::extract::extract_text;
use crate::rerank::Reranker;
use crate::{RagError, Result};

pub use confidence::Confidence;
pub use prompt::build_prompt;

pub const INDEX_SUCCESS_STATUS: &str = "Document indexed successfully";

/// Produces a complete answer for a prompt
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Result of indexing one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOutcome {
    pub chunk_count: usize,
    pub status: String,
    pub source: String,
}

/// Where a returned passage came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source: String,
    pub chunk_id: usize,
}

/// A chunk that survived retrieval and reranking
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Inner product between the question and chunk embeddings
    pub similarity_score: f32,
    /// Cross-encoder relevance in `[0, 1]`
    pub relevance_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    /// Texts of the chunks the answer was grounded on, most relevant first
    pub sources: Vec<String>,
    /// Reranker scores aligned with `sources`
    pub similarity_scores: Vec<f32>,
    pub confidence: Confidence,
    pub citations: Vec<Citation>,
}

/// Owns the index store and the model collaborators for both the write and read paths
pub struct RagPipeline {
    store: IndexStore,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Reranker,
    generator: Arc<dyn Generator>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
}

impl std::fmt::Debug for RagPipeline {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("store", &self.store)
            .field("embedding_model", &self.embedder.model_name())
            .field("chunking", &self.chunking)
            .field("retrieval", &self.retrieval)
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    #[inline]
    pub fn new(
        store: IndexStore,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Reranker,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
            generator,
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }

    #[inline]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[inline]
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    #[inline]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Chunk, embed and append a document to the index
    #[inline]
    pub async fn index_document(&self, text: &str, source: &str) -> Result<IndexOutcome> {
        let started = Instant::now();

        let chunks = chunk_text(text, &self.chunking)?;
        let chunk_count = chunks.len();
        debug!(
            "Chunked {} into {} chunks in {:?}",
            source,
            chunk_count,
            started.elapsed()
        );

        let embed_started = Instant::now();
        let embeddings = self.embed_normalized(&chunks)?;
        let dimension = embeddings.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(RagError::Embedding(
                "embedding provider returned empty vectors".to_string(),
            ));
        }
        info!(
            "Embedded {} chunks ({} dimensions) in {:?}",
            chunk_count,
            dimension,
            embed_started.elapsed()
        );

        let mut snapshot = self
            .store
            .create_or_load(dimension, self.embedder.model_name())
            .await?;
        let records = chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_id, text)| Chunk::new(text, source, chunk_id))
            .collect();
        snapshot.append(&embeddings, records)?;
        self.store.save(&mut snapshot).await?;

        info!(
            "Indexed {} ({} chunks, {} total) in {:?}",
            source,
            chunk_count,
            snapshot.len(),
            started.elapsed()
        );

        Ok(IndexOutcome {
            chunk_count,
            status: INDEX_SUCCESS_STATUS.to_string(),
            source: source.to_string(),
        })
    }

    /// Extract a file's text and index it under `name`, or the file name when absent
    #[inline]
    pub async fn index_file(&self, path: &Path, name: Option<&str>) -> Result<IndexOutcome> {
        let source = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|file_name| file_name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    RagError::InvalidRequest(format!("{} has no file name", path.display()))
                })?,
        };

        let text = extract_text(path)?;
        self.index_document(&text, &source).await
    }

    /// Find the `top_k` most relevant chunks for a question, best first
    #[inline]
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        validate_request(question, top_k)?;
        let started = Instant::now();

        let snapshot = self.store.load().await?;

        let query = self
            .embed_normalized(&[question.to_string()])?
            .pop()
            .ok_or_else(|| RagError::Embedding("no embedding for the question".to_string()))?;

        let candidate_k = self.retrieval.reranker_top_n.max(top_k);
        let hits = snapshot.index().search(&query, candidate_k)?;
        let candidates: Vec<(&Chunk, f32)> = hits
            .iter()
            .filter_map(|hit| snapshot.chunk_for(hit).map(|chunk| (chunk, hit.score)))
            .collect();
        debug!(
            "Vector search returned {} candidates in {:?}",
            candidates.len(),
            started.elapsed()
        );

        let rerank_started = Instant::now();
        let texts: Vec<String> = candidates
            .iter()
            .map(|(chunk, _)| chunk.text.clone())
            .collect();
        let scored = self.reranker.rerank(question, &texts)?;
        debug!(
            "Reranked {} candidates in {:?}",
            scored.len(),
            rerank_started.elapsed()
        );

        let retrieved: Vec<RetrievedChunk> = scored
            .into_iter()
            .filter_map(|candidate| {
                candidates
                    .get(candidate.index)
                    .map(|&(chunk, similarity_score)| RetrievedChunk {
                        chunk: chunk.clone(),
                        similarity_score,
                        relevance_score: candidate.score,
                    })
            })
            .take(top_k)
            .collect();

        info!(
            "Retrieved {} of {} candidates in {:?}",
            retrieved.len(),
            candidate_k,
            started.elapsed()
        );
        Ok(retrieved)
    }

    /// Answer a question from the indexed documents
    #[inline]
    pub async fn answer_question(&self, question: &str, top_k: usize) -> Result<Answer> {
        let started = Instant::now();
        let retrieved = self.retrieve(question, top_k).await?;

        let prompt = build_prompt(
            question,
            retrieved.iter().map(|r| r.chunk.text.as_str()),
        );

        let generate_started = Instant::now();
        let answer = self
            .generator
            .generate(&prompt)
            .map_err(|e| RagError::Upstream(format!("generation failed: {:#}", e)))?;
        debug!("Generated answer in {:?}", generate_started.elapsed());

        let similarity_scores: Vec<f32> = retrieved.iter().map(|r| r.relevance_score).collect();
        let confidence = Confidence::from_scores(&similarity_scores);
        let citations = retrieved
            .iter()
            .map(|r| Citation {
                source: r.chunk.source.clone(),
                chunk_id: r.chunk.chunk_id,
            })
            .collect();
        let sources = retrieved.into_iter().map(|r| r.chunk.text).collect();

        info!(
            "Answered question with {} confidence in {:?}",
            confidence,
            started.elapsed()
        );

        Ok(Answer {
            answer,
            sources,
            similarity_scores,
            confidence,
            citations,
        })
    }

    fn embed_normalized(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = self
            .embedder
            .embed(texts)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        if embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "provider returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }

        for embedding in &mut embeddings {
            normalize_l2(embedding);
        }
        Ok(embeddings)
    }
}

fn validate_request(question: &str, top_k: usize) -> Result<()> {
    if question.trim().is_empty() {
        return Err(RagError::InvalidRequest(
            "question must not be empty".to_string(),
        ));
    }
    if top_k == 0 {
        return Err(RagError::InvalidRequest(
            "top_k must be at least 1".to_string(),
        ));
    }
    Ok(())
}
