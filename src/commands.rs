use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{info, warn};

use crate::RagError;
use crate::config::Config;
use crate::database::IndexStore;
use crate::embeddings::{EmbeddingProvider, ModelCache};
use crate::ollama::OllamaClient;
use crate::rag::{Answer, IndexOutcome, RagPipeline};
use crate::rerank::{HttpCrossEncoder, Reranker};

/// Ollama clients shared for the life of the process
static OLLAMA_CLIENTS: LazyLock<ModelCache<OllamaClient>> = LazyLock::new(ModelCache::new);
static CROSS_ENCODERS: LazyLock<ModelCache<HttpCrossEncoder>> = LazyLock::new(ModelCache::new);

/// Which side of the pipeline a command drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Indexing only needs the embedding model
    Index,
    /// Answering needs both the embedding and the generation model
    Answer,
}

/// Wire the pipeline to the configured Ollama server and reranker.
///
/// The server is checked for the models `workload` needs on every call; only
/// the client handles are cached.
#[inline]
pub fn build_pipeline(config: &Config, workload: Workload) -> Result<RagPipeline> {
    config.validate().map_err(RagError::from)?;

    let ollama_key = format!(
        "{}|{}|{}",
        config.ollama.ollama_url()?,
        config.ollama.embedding_model,
        config.ollama.generation_model
    );
    let ollama = OLLAMA_CLIENTS.get_or_try_init(&ollama_key, || OllamaClient::new(&config.ollama))?;

    let check = match workload {
        Workload::Index => ollama.check_models(&[ollama.embedding_model()]),
        Workload::Answer => ollama.health_check(),
    };
    check.context("Ollama is not ready; run 'context-rag config' to check the connection")?;

    let reranker_key = format!("{}|{}", config.reranker.base_url, config.reranker.model);
    let cross_encoder = CROSS_ENCODERS
        .get_or_try_init(&reranker_key, || HttpCrossEncoder::new(&config.reranker))?;

    let handle: Arc<OllamaClient> = Arc::clone(&ollama);
    let embedder: Arc<dyn EmbeddingProvider> = handle;
    Ok(RagPipeline::new(
        IndexStore::new(config.index_path()),
        embedder,
        Reranker::new(cross_encoder),
        ollama,
    )
    .with_chunking(config.chunking)
    .with_retrieval(config.retrieval))
}

/// Index a file and return the outcome for printing
#[inline]
pub async fn index_file(config: &Config, path: &Path, name: Option<&str>) -> Result<IndexOutcome> {
    info!("Indexing document: {}", path.display());

    let pipeline = build_pipeline(config, Workload::Index)?;
    let bar = spinner(&format!("Indexing {}", path.display()));
    let outcome = pipeline.index_file(path, name).await;
    bar.finish_and_clear();

    outcome.with_context(|| format!("Failed to index {}", path.display()))
}

/// Answer a question from the index
#[inline]
pub async fn ask(config: &Config, question: &str, top_k: Option<usize>) -> Result<Answer> {
    let top_k = top_k.unwrap_or(config.retrieval.default_top_k);

    let pipeline = build_pipeline(config, Workload::Answer)?;
    let bar = spinner("Thinking");
    let answer = pipeline.answer_question(question, top_k).await;
    bar.finish_and_clear();

    answer.context("Failed to answer question")
}

/// Print a value as pretty JSON on stdout
#[inline]
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Show the state of the index and the model services
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 Context RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Index Status:");
    let store = IndexStore::new(config.index_path());
    println!("   📁 Path: {}", store.path().display());

    match store.header().await {
        Ok(header) => {
            println!("   📄 Chunks: {}", header.chunk_count);
            println!("   🔢 Vectors: {}", header.vector_count);
            println!("   📐 Dimension: {}", header.dimension);
            println!("   🤖 Embedding Model: {}", header.embedding_model);
            println!(
                "   🕒 Last Updated: {}",
                header.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );

            match store.consistency_report().await {
                Ok(report) if report.is_consistent => {
                    println!("   ✅ Consistency: {}", report.summary());
                }
                Ok(report) => {
                    println!("   ⚠️  Consistency: {}", report.summary());
                }
                Err(e) => println!("   ❌ Failed to check consistency: {}", e),
            }

            match store.sources().await {
                Ok(sources) => {
                    println!();
                    println!("📚 Documents ({} total):", sources.len());
                    for (source, chunks) in sources {
                        println!("   • {} ({} chunks)", source, chunks);
                    }
                }
                Err(e) => println!("   ❌ Failed to list documents: {}", e),
            }
        }
        Err(RagError::IndexNotFound(_)) => {
            println!("   📭 No documents indexed yet");
        }
        Err(e) => {
            println!("   ❌ Failed to read index: {}", e);
        }
    }

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding Model: {}", config.ollama.embedding_model);
                println!("   💬 Generation Model: {}", config.ollama.generation_model);
            }
            Err(e) => {
                warn!("Ollama health check failed: {:#}", e);
                println!("   ⚠️  Ollama: Unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Invalid configuration - {}", e);
        }
    }

    println!();
    println!("🎯 Reranker:");
    println!("   🌐 Endpoint: {}", config.reranker.base_url);
    println!("   📋 Model: {}", config.reranker.model);

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'context-rag index <file>' to add a document");
    println!("   • Use 'context-rag ask \"<question>\"' to query your documents");
    println!("   • Use 'context-rag config' to change connection settings");

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
