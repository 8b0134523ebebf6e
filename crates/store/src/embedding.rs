//! Text embedders.
//!
//! Two implementations of [`Embedder`] are provided:
//!
//! - [`EmbeddingService`] runs a fastembed ONNX model in-process
//!   (all-MiniLM-L6-v2, 384 dimensions, by default).
//! - [`OllamaEmbedder`] calls a local or remote Ollama `/api/embed` endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use once_cell::sync::OnceCell;
use ragdemo_common::{Embedding, RagError, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use tracing::{debug, info, instrument};

use crate::types::{EmbeddingConfig, EmbeddingProvider};

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embeds several texts, preserving order.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// Prepares the embedder ahead of the first request.
    async fn warmup(&self) -> Result<()> {
        Ok(())
    }
}

/// Errors raised while driving the local fastembed model.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Failed to generate embeddings: {0}")]
    Generation(String),

    #[error("Blocking task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<EmbeddingError> for RagError {
    fn from(e: EmbeddingError) -> Self {
        RagError::ModelUnavailable(e.to_string())
    }
}

/// Local embedding service backed by fastembed.
///
/// The model is initialized on first use and shared across all embedding calls.
pub struct EmbeddingService {
    name: String,
    model_name: EmbeddingModel,
    dimension: usize,
    model: Arc<OnceCell<Arc<TextEmbedding>>>,
}

impl EmbeddingService {
    /// Creates a new embedding service with the specified model.
    ///
    /// The model is not loaded until the first embedding call.
    pub fn new(model_name: EmbeddingModel) -> Self {
        let dimension = match model_name {
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::AllMiniLML6V2Q => 384,
            EmbeddingModel::AllMiniLML12V2 => 384,
            EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::BGELargeENV15 => 1024,
            EmbeddingModel::NomicEmbedTextV15 => 768,
            EmbeddingModel::MultilingualE5Small => 384,
            EmbeddingModel::MultilingualE5Base => 768,
            EmbeddingModel::MultilingualE5Large => 1024,
            _ => 384,
        };

        Self {
            name: format!("{model_name:?}"),
            model_name,
            dimension,
            model: Arc::new(OnceCell::new()),
        }
    }

    /// Creates an embedding service from a model name string.
    pub fn from_model_str(model_name: &str) -> Result<Self> {
        let model = match model_name {
            "all-MiniLM-L6-v2" | "AllMiniLML6V2" => EmbeddingModel::AllMiniLML6V2,
            "all-MiniLM-L6-v2-q" | "AllMiniLML6V2Q" => EmbeddingModel::AllMiniLML6V2Q,
            "all-MiniLM-L12-v2" | "AllMiniLML12V2" => EmbeddingModel::AllMiniLML12V2,
            "bge-small-en-v1.5" | "BGESmallENV15" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" | "BGEBaseENV15" => EmbeddingModel::BGEBaseENV15,
            "bge-large-en-v1.5" | "BGELargeENV15" => EmbeddingModel::BGELargeENV15,
            "nomic-embed-text-v1.5" | "NomicEmbedTextV15" => EmbeddingModel::NomicEmbedTextV15,
            "multilingual-e5-small" | "MultilingualE5Small" => EmbeddingModel::MultilingualE5Small,
            "multilingual-e5-base" | "MultilingualE5Base" => EmbeddingModel::MultilingualE5Base,
            "multilingual-e5-large" | "MultilingualE5Large" => EmbeddingModel::MultilingualE5Large,
            _ => {
                return Err(RagError::Config(format!(
                    "Unknown embedding model: '{model_name}'. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, nomic-embed-text-v1.5, etc."
                )));
            }
        };
        let mut service = Self::new(model);
        service.name = model_name.to_string();
        Ok(service)
    }

    /// Creates an embedding service from config, validating dimension matches.
    pub fn from_config(model_name: &str, expected_dim: usize) -> Result<Self> {
        let service = Self::from_model_str(model_name)?;
        if service.dimension != expected_dim {
            return Err(RagError::Config(format!(
                "Dimension mismatch: model '{}' produces {}-dim vectors but config specifies {}",
                model_name, service.dimension, expected_dim
            )));
        }
        Ok(service)
    }

    /// Whether the ONNX model has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Runs `f` on the blocking pool with the model loaded.
    ///
    /// Loading downloads and parses the model, so it happens inside the
    /// blocking task as well.
    async fn with_model<T, F>(&self, f: F) -> std::result::Result<T, EmbeddingError>
    where
        T: Send + 'static,
        F: FnOnce(&TextEmbedding) -> std::result::Result<T, EmbeddingError> + Send + 'static,
    {
        let cell = Arc::clone(&self.model);
        let model_name = self.model_name.clone();
        let dimension = self.dimension;
        task::spawn_blocking(move || {
            let model = load_model(&cell, model_name, dimension)?;
            f(&model)
        })
        .await?
    }

    async fn run(&self, texts: Vec<String>) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        self.with_model(move |model| {
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Generation(e.to_string()))
        })
        .await
    }
}

fn load_model(
    cell: &OnceCell<Arc<TextEmbedding>>,
    model_name: EmbeddingModel,
    dimension: usize,
) -> std::result::Result<Arc<TextEmbedding>, EmbeddingError> {
    cell.get_or_try_init(|| {
        info!(model = ?model_name, "Initializing embedding model");

        let mut options = InitOptions::new(model_name.clone());
        options.show_download_progress = true;
        let model =
            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        info!(model = ?model_name, dimension, "Embedding model initialized");
        Ok(Arc::new(model))
    })
    .cloned()
}

impl Default for EmbeddingService {
    fn default() -> Self {
        let mut service = Self::new(EmbeddingModel::AllMiniLML6V2);
        service.name = "all-MiniLM-L6-v2".into();
        service
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let vectors = self.run(vec![text.to_string()]).await?;
        let vector = vectors.into_iter().next().ok_or_else(|| {
            RagError::ModelUnavailable("Empty embedding result".into())
        })?;
        debug!(dimension = vector.len(), "Generated embedding");
        Ok(Embedding::new(vector))
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len()))]
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.run(texts.to_vec()).await?;
        Ok(vectors.into_iter().map(Embedding::new).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    /// Loads the model ahead of the first request.
    #[instrument(skip(self), fields(model = %self.name))]
    async fn warmup(&self) -> Result<()> {
        if self.is_loaded() {
            debug!("Model already initialized, skipping warmup");
            return Ok(());
        }
        self.with_model(|_| Ok(())).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Embedder backed by Ollama's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    http_client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: Option<String>, model: String, dimension: usize) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            dimension,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Embedding>> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&OllamaEmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| RagError::ModelUnavailable(format!("Embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::ModelUnavailable(format!(
                "Embedding API error {status}: {body_text}"
            )));
        }

        let parsed: OllamaEmbedResponse = response.json().await.map_err(|e| {
            RagError::ModelUnavailable(format!("Failed to parse embedding response: {e}"))
        })?;

        if parsed.embeddings.len() != input.len() {
            return Err(RagError::ModelUnavailable(format!(
                "Embedding API returned {} vectors for {} inputs",
                parsed.embeddings.len(),
                input.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(Embedding::new).collect())
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.request(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| RagError::ModelUnavailable("Empty embedding result".into()))
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len()))]
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Builds the configured embedder.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    info!(provider = ?config.provider, model = %config.model, "Building embedder");
    match config.provider {
        EmbeddingProvider::Local => Ok(Arc::new(EmbeddingService::from_config(
            &config.model,
            config.dimension,
        )?)),
        EmbeddingProvider::Ollama => {
            if config.dimension == 0 {
                return Err(RagError::Config("embedding dimension must be positive".into()));
            }
            let embedder =
                OllamaEmbedder::new(config.api_url.clone(), config.model.clone(), config.dimension)
                    .with_timeout(Duration::from_millis(config.timeout_ms))?;
            Ok(Arc::new(embedder))
        }
    }
}
