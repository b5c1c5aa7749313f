// Capability interfaces over the embedding and generation backends, plus the
// provider selection done once at startup.

pub mod ollama;

pub use ollama::{ModelInfo, OllamaClient};

use crate::config::Config;
use crate::{RagError, Result};

/// System prompt for the retrieval-augmented answer.
pub const SYSTEM_PROMPT_RAG: &str = "You answer strictly from the provided context. \
If the context is insufficient, say you don't have enough information. \
Cite sources inline like [filename#chunkN]. Be concise.";

/// System prompt for the bare comparison answer.
pub const SYSTEM_PROMPT_BARE: &str =
    "You are a helpful assistant. Answer concisely. If unsure, say so.";

/// Maps text to fixed-length numeric vectors.
pub trait Embedder {
    /// Embed a batch of texts. The result has the same length and order as
    /// the input, and every vector shares one dimensionality.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Name of the embedding model producing these vectors.
    fn model_name(&self) -> &str;
}

/// Produces an answer from a system prompt and a user prompt.
pub trait Generator {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[inline]
pub fn create_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaClient::new(config)?)),
        other => Err(RagError::InvalidConfig(format!(
            "unknown backend provider '{other}'"
        ))),
    }
}

#[inline]
pub fn create_generator(config: &Config) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaClient::new(config)?)),
        other => Err(RagError::InvalidConfig(format!(
            "unknown backend provider '{other}'"
        ))),
    }
}
