use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding backend error: {0}")]
    EmbeddingBackend(String),

    #[error("Generation backend error: {0}")]
    GenerationBackend(String),

    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("No index has been built yet. Add documents and run a build first.")]
    EmptyIndex,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod backends;
pub mod chunker;
pub mod commands;
pub mod config;
pub mod context;
pub mod corpus;
pub mod index;
