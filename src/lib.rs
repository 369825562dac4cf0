use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Document contains no readable text.")]
    EmptyDocument,

    #[error("Vector index not found at {}. Index a document first.", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Embedding dimension mismatch: index expects {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Index store is inconsistent: {0}")]
    Consistency(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod extract;
pub mod ollama;
pub mod rag;
pub mod rerank;
