
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{Embedder, Generator};
use crate::config::Config;
use crate::{RagError, Result};

const EMBED_TIMEOUT_SECONDS: u64 = 60;
const CHAT_TIMEOUT_SECONDS: u64 = 180;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for a local Ollama instance. Implements both the
/// [`Embedder`] and [`Generator`] capabilities.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embed_model: String,
    chat_model: String,
    batch_size: u32,
    temperature: f32,
    num_ctx: u32,
    agent: ureq::Agent,
    chat_agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    options: ChatOptions,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .url()
            .map_err(|e| RagError::InvalidConfig(e.to_string()))?;

        let agent = agent_with_timeout(Duration::from_secs(EMBED_TIMEOUT_SECONDS));
        let chat_agent = agent_with_timeout(Duration::from_secs(CHAT_TIMEOUT_SECONDS));

        Ok(Self {
            base_url,
            embed_model: config.ollama.embed_model.clone(),
            chat_model: config.ollama.chat_model.clone(),
            batch_size: config.ollama.batch_size,
            temperature: config.ollama.temperature,
            num_ctx: config.ollama.num_ctx,
            agent,
            chat_agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = agent_with_timeout(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Test connection to the Ollama server and verify that the configured
    /// embedding model is available.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping()?;
        self.validate_model()?;

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.base_url, self.embed_model
        );
        Ok(())
    }

    /// Ping the Ollama server to check whether it is responsive.
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self.embed_url("/api/tags")?;

        debug!("Pinging Ollama server at {}", url);

        self.request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .map_err(|e| RagError::EmbeddingBackend(format!("server ping failed: {e}")))?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured embedding model is available.
    #[inline]
    pub fn validate_model(&self) -> Result<()> {
        debug!("Validating model: {}", self.embed_model);

        let models = self.list_models()?;

        if models.iter().any(|m| m.name == self.embed_model) {
            debug!("Model {} is available", self.embed_model);
            Ok(())
        } else {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.embed_model, available
            );
            Err(RagError::EmbeddingBackend(format!(
                "model '{}' is not available. Available models: {available:?}",
                self.embed_model
            )))
        }
    }

    /// List all models known to the server.
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.embed_url("/api/tags")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .map_err(|e| RagError::EmbeddingBackend(format!("failed to fetch models: {e}")))?;

        let models_response: ModelsResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::EmbeddingBackend(format!("malformed models response: {e}")))?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.embed_model.clone(),
            prompt: text.to_string(),
        };
        let url = self.embed_url("/api/embeddings")?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::EmbeddingBackend(format!("request serialization: {e}")))?;

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .map_err(RagError::EmbeddingBackend)?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::EmbeddingBackend(format!("malformed embedding response: {e}")))?;

        if embed_response.embedding.is_empty() {
            return Err(RagError::EmbeddingBackend(
                "embedding response contained an empty vector".to_string(),
            ));
        }

        Ok(embed_response.embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.len() == 1 {
            // The single-item endpoint is the lowest common denominator
            // across Ollama versions.
            return Ok(vec![self.embed_single(&texts[0])?]);
        }

        let request = BatchEmbedRequest {
            model: self.embed_model.clone(),
            inputs: texts.to_vec(),
        };
        let url = self.embed_url("/api/embed")?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::EmbeddingBackend(format!("request serialization: {e}")))?;

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .map_err(RagError::EmbeddingBackend)?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                RagError::EmbeddingBackend(format!("malformed batch embedding response: {e}"))
            })?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingBackend(format!(
                "mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            )));
        }

        Ok(batch_response.embeddings)
    }

    fn embed_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RagError::EmbeddingBackend(format!("failed to build URL: {e}")))
    }

    fn request_with_retry<F>(&self, mut request_fn: F) -> std::result::Result<String, String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(format!("client error: HTTP {status}"));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(format!("non-retryable error: {error}"));
                    }

                    last_error = Some(format!("request error: {error}"));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| "request failed after retries".to_string()))
    }
}

fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let batch_vectors = self.embed_batch(batch)?;
            vectors.extend(batch_vectors);
        }

        // Every vector in one call must share one dimensionality; a backend
        // that disagrees with itself corrupts similarity comparisons.
        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(RagError::EmbeddingBackend(
                "backend returned zero-dimensional vectors".to_string(),
            ));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RagError::EmbeddingBackend(format!(
                "inconsistent embedding dimensions: expected {dimension}, got {}",
                bad.len()
            )));
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_single(text)
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.embed_model
    }
}

impl Generator for OllamaClient {
    #[inline]
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        debug!(
            "Requesting chat completion from model {} (prompt length: {})",
            self.chat_model,
            user_prompt.len()
        );

        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            options: ChatOptions {
                temperature: self.temperature,
                num_ctx: self.num_ctx,
            },
            stream: false,
        };

        let url = self
            .base_url
            .join("/api/chat")
            .map_err(|e| RagError::GenerationBackend(format!("failed to build URL: {e}")))?;
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::GenerationBackend(format!("request serialization: {e}")))?;

        let response_text = self
            .request_with_retry(|| {
                self.chat_agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .map_err(RagError::GenerationBackend)?;

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::GenerationBackend(format!("malformed chat response: {e}")))?;

        let content = chat_response
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(RagError::GenerationBackend(
                "chat response contained no message content".to_string(),
            ));
        }

        Ok(content)
    }
}
