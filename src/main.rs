use clap::{Parser, Subcommand};
use ragcmp::commands::{ask, build_index, clear_data, list_files, show_status};
use ragcmp::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "ragcmp")]
#[command(about = "Compare retrieval-augmented and bare LLM answers over a local document set")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Ollama connection and indexing settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk and embed all documents in the data directory
    Build {
        /// Chunk window size in characters
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Overlap between adjacent chunks in characters
        #[arg(long)]
        overlap: Option<usize>,
        /// Embedding model to use for this build
        #[arg(long)]
        embed_model: Option<String>,
    },
    /// Answer a question with and without retrieved context
    Ask {
        /// The question to answer
        question: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show data, index and backend status
    Status,
    /// List the files in the data directory
    List,
    /// Delete all documents and index artifacts
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
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
        Commands::Build {
            chunk_size,
            overlap,
            embed_model,
        } => {
            build_index(Config::load()?, chunk_size, overlap, embed_model)?;
        }
        Commands::Ask { question, top_k } => {
            ask(&Config::load()?, &question, top_k)?;
        }
        Commands::Status => {
            show_status(&Config::load()?)?;
        }
        Commands::List => {
            list_files(&Config::load()?)?;
        }
        Commands::Clear { yes } => {
            clear_data(&Config::load()?, yes)?;
        }
    }

    Ok(())
}
