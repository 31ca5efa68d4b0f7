//! Concrete embedding providers.
//!
//! Implements the core [`EmbeddingProvider`] trait for:
//! - **[`DisabledProvider`]**: fails every call; used when embeddings are not configured.
//! - **[`LocalProvider`]**: in-process sentence-transformer inference via fastembed
//!   (feature `local-embeddings`); no network calls after the model download.
//! - **[`OllamaProvider`]**: a local Ollama instance's `/api/embed` endpoint.
//! - **[`OpenAIProvider`]**: the OpenAI embeddings API.
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to instantiate the appropriate provider based
//! on the configuration:
//!
//! ```rust
//! # use chunkvec::config::EmbeddingConfig;
//! # use chunkvec::core::embedding::EmbeddingProvider;
//! # use chunkvec::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```
//!
//! # Retry Strategy
//!
//! The HTTP providers retry only when `embedding.max_retries > 0`:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::warn;

use chunkvec_core::embedding::EmbeddingProvider;
use chunkvec_core::Error;

use crate::config::EmbeddingConfig;

/// Dimensionality assumed when nothing configures one (all-MiniLM-L6-v2).
pub const DEFAULT_DIMS: usize = 384;

fn provider_err(message: impl Into<String>) -> Error {
    Error::ProviderError(message.into())
}

/// Check that a provider answered with one vector per input.
fn check_count(label: &str, expected: usize, got: usize) -> chunkvec_core::Result<()> {
    if expected != got {
        return Err(provider_err(format!(
            "{} returned {} embeddings for {} inputs",
            label, got, expected
        )));
    }
    Ok(())
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration. The
/// store can still be opened, listed, and counted.
pub struct DisabledProvider {
    dims: usize,
}

impl DisabledProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, _texts: &[String]) -> chunkvec_core::Result<Vec<Vec<f32>>> {
        Err(provider_err(
            "embedding provider is disabled; set [embedding] provider in config",
        ))
    }
}

// ============ Shared HTTP plumbing ============

/// HTTP client settings shared by the Ollama and OpenAI providers.
struct HttpSettings {
    client: reqwest::Client,
    max_retries: u32,
    batch_size: usize,
}

impl HttpSettings {
    fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            batch_size: config.batch_size,
        })
    }

    /// POST `body` to `url`, retrying transient failures with exponential
    /// backoff, and return the parsed JSON response.
    async fn post_json(
        &self,
        label: &str,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> chunkvec_core::Result<serde_json::Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(body);
            if let Some(token) = bearer {
                request = request.header("Authorization", format!("Bearer {}", token));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<serde_json::Value>()
                            .await
                            .map_err(|e| provider_err(format!("{} response: {}", label, e)));
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = provider_err(format!("{} API error {}: {}", label, status, body_text));

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(attempt, %status, "{} request failed", label);
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "{} connection failed", label);
                    last_err = Some(provider_err(format!(
                        "{} connection error ({}): {}",
                        label, url, e
                    )));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| provider_err(format!("{} embedding failed", label))))
    }
}

/// Read an array of numeric arrays into vectors.
fn parse_vectors(label: &str, arrays: &[serde_json::Value]) -> chunkvec_core::Result<Vec<Vec<f32>>> {
    arrays
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .ok_or_else(|| provider_err(format!("invalid {} response: embedding is not an array", label)))?
                .iter()
                .map(|v| {
                    v.as_f64()
                        .map(|f| f as f32)
                        .ok_or_else(|| provider_err(format!("invalid {} response: non-numeric component", label)))
                })
                .collect()
        })
        .collect()
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default:
/// `http://localhost:11434`). Requires Ollama to be running with an
/// embedding model pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    http: HttpSettings,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url,
            http: HttpSettings::new(config)?,
        })
    }
}

/// Extract `embeddings[]` from an Ollama `/api/embed` response.
fn parse_ollama_response(json: &serde_json::Value) -> chunkvec_core::Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| provider_err("invalid Ollama response: missing embeddings array"))?;
    parse_vectors("Ollama", embeddings)
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn max_batch_size(&self) -> Option<usize> {
        Some(self.http.batch_size)
    }
    async fn embed(&self, texts: &[String]) -> chunkvec_core::Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.url.trim_end_matches('/'));
        let json = self.http.post_json("Ollama", &url, None, &body).await?;
        let vectors = parse_ollama_response(&json)?;
        check_count("Ollama", texts.len(), vectors.len())?;
        Ok(vectors)
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST /v1/embeddings` with the configured model. Requires the
/// `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    api_key: String,
    http: HttpSettings,
}

impl OpenAIProvider {
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config,
    /// or if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) => key,
            Err(_) => bail!("OPENAI_API_KEY environment variable not set"),
        };

        Ok(Self {
            model,
            dims,
            api_key,
            http: HttpSettings::new(config)?,
        })
    }
}

/// Extract `data[].embedding`, restoring input order from `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> chunkvec_core::Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| provider_err("invalid OpenAI response: missing data array"))?;

    let mut items: Vec<(u64, serde_json::Value)> = data
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let index = item.get("index").and_then(|i| i.as_u64()).unwrap_or(pos as u64);
            let embedding = item
                .get("embedding")
                .cloned()
                .ok_or_else(|| provider_err("invalid OpenAI response: missing embedding"))?;
            Ok((index, embedding))
        })
        .collect::<chunkvec_core::Result<_>>()?;
    items.sort_by_key(|(index, _)| *index);

    let arrays: Vec<serde_json::Value> = items.into_iter().map(|(_, e)| e).collect();
    parse_vectors("OpenAI", &arrays)
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn max_batch_size(&self) -> Option<usize> {
        Some(self.http.batch_size)
    }
    async fn embed(&self, texts: &[String]) -> chunkvec_core::Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self
            .http
            .post_json(
                "OpenAI",
                "https://api.openai.com/v1/embeddings",
                Some(&self.api_key),
                &body,
            )
            .await?;
        let vectors = parse_openai_response(&json)?;
        check_count("OpenAI", texts.len(), vectors.len())?;
        Ok(vectors)
    }
}

// ============ Local Provider (fastembed) ============

/// Resolve the local model name and its dimensionality.
pub fn resolve_local_model(config: &EmbeddingConfig) -> (String, usize) {
    let model_name = config
        .model
        .clone()
        .unwrap_or_else(|| "all-minilm-l6-v2".to_string());

    let dims = config.dims.unwrap_or(match model_name.as_str() {
        "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
        "bge-large-en-v1.5" => 1024,
        _ => DEFAULT_DIMS,
    });

    (model_name, dims)
}

/// Embedding provider for in-process inference.
///
/// The model is downloaded from Hugging Face on first use, cached, and
/// kept loaded for the lifetime of the provider. Inference runs on the
/// blocking thread pool.
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<Option<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config);
        config_to_fastembed_model(&model_name)?;
        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(None)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> chunkvec_core::Result<Vec<Vec<f32>>> {
        let model_name = self.model_name.clone();
        let batch_size = self.batch_size;
        let slot = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = slot
                .lock()
                .map_err(|_| provider_err("local embedding model lock poisoned"))?;
            if guard.is_none() {
                let which = config_to_fastembed_model(&model_name)
                    .map_err(|e| provider_err(e.to_string()))?;
                let loaded = fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(which).with_show_download_progress(true),
                )
                .map_err(|e| {
                    provider_err(format!("failed to initialize local embedding model: {}", e))
                })?;
                *guard = Some(loaded);
            }
            let model = guard
                .as_mut()
                .ok_or_else(|| provider_err("local embedding model not loaded"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| provider_err(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| provider_err(format!("local embedding task failed: {}", e)))??;

        check_count("local model", expected, vectors.len())?;
        Ok(vectors)
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings`) |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the provider
/// cannot be initialized (missing config, API key, or feature flag).
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider::new(
            config.dims.unwrap_or(DEFAULT_DIMS),
        ))),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let p = DisabledProvider::new(4);
        assert_eq!(p.dims(), 4);
        let err = p.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::ProviderError(_)));
    }

    #[test]
    fn test_create_provider_disabled_uses_default_dims() {
        let p = create_provider(&EmbeddingConfig::default()).unwrap();
        assert_eq!(p.model_name(), "disabled");
        assert_eq!(p.dims(), DEFAULT_DIMS);
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_resolve_local_model_defaults() {
        let (name, dims) = resolve_local_model(&EmbeddingConfig::default());
        assert_eq!(name, "all-minilm-l6-v2");
        assert_eq!(dims, 384);
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({ "embeddings": [[0.5, 1.0], [2.0, -1.0]] });
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.5, 1.0], vec![2.0, -1.0]]);
    }

    #[test]
    fn test_parse_openai_response_restores_index_order() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let json = serde_json::json!({ "embeddings": [["a"]] });
        assert!(parse_ollama_response(&json).is_err());
    }

    #[test]
    fn test_check_count() {
        assert!(check_count("x", 2, 2).is_ok());
        assert!(matches!(check_count("x", 2, 1), Err(Error::ProviderError(_))));
    }
}
