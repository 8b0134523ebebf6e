//! Store types and configuration.

use ragdemo_common::{Embedding, TextSegment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A nearest-neighbour query.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: Embedding,
    pub max_results: usize,
    /// Matches scoring below this are dropped
    pub min_score: f32,
}

impl SearchRequest {
    pub fn new(query: Embedding, max_results: usize) -> Self {
        Self {
            query,
            max_results,
            min_score: 0.0,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

/// One search hit.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingMatch {
    pub id: String,
    /// Relevance in `[0, 1]`, higher is closer
    pub score: f32,
    pub embedding: Embedding,
    pub segment: TextSegment,
}

/// What to do with the embedding table when the store opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateOption {
    /// Expect the table to exist already
    None,
    CreateIfNotExists,
    /// Drop any existing table and start empty
    #[default]
    CreateOrReplace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Configuration for the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default)]
    pub create_option: CreateOption,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/embeddings.db")
}

fn default_table() -> String {
    "profile_embeddings".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
            table: default_table(),
            create_option: CreateOption::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// In-process ONNX model via fastembed
    #[default]
    Local,
    Ollama,
}

/// Configuration for the text embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dim")]
    pub dimension: usize,

    /// Ollama endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_ms: u64,
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}

fn default_embedding_dim() -> usize {
    384 // MiniLM dimension
}

fn default_embedding_timeout() -> u64 {
    60_000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            dimension: default_embedding_dim(),
            api_url: None,
            timeout_ms: default_embedding_timeout(),
        }
    }
}
