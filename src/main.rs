use anyhow::Result;
use clap::{Parser, Subcommand};
use context_rag::commands::{ask, index_file, print_json, show_status};
use context_rag::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "context-rag")]
#[command(about = "Ask questions about your documents with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Ollama connection, reranker and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk, embed and store a document
    Index {
        /// Path to a text, markdown or HTML file
        file: PathBuf,
        /// Source name recorded for citations, defaults to the file name
        #[arg(long)]
        name: Option<String>,
    },
    /// Answer a question from the indexed documents
    Ask {
        /// The question to answer
        question: String,
        /// Number of passages to ground the answer on
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show index statistics and service health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Index { file, name } => {
            let config = Config::load_default()?;
            let outcome = index_file(&config, &file, name.as_deref()).await?;
            print_json(&outcome)?;
        }
        Commands::Ask { question, top_k } => {
            let config = Config::load_default()?;
            let answer = ask(&config, &question, top_k).await?;
            print_json(&answer)?;
        }
        Commands::Status => {
            let config = Config::load_default()?;
            show_status(&config).await?;
        }
    }

    Ok(())
}
