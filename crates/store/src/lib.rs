//! Embedding models and vector stores for ragdemo.
//!
//! # Components
//!
//! - **Embedders**: [`EmbeddingService`] (local fastembed ONNX model) and
//!   [`OllamaEmbedder`] (HTTP), both behind the [`Embedder`] trait.
//! - **Vector stores**: [`SqliteVectorStore`] (durable) and
//!   [`InMemoryVectorStore`], both behind the [`VectorStore`] trait.
//!
//! Search ranks by cosine similarity rescaled to `[0, 1]`; ties keep
//! insertion order. Every store is bound to one embedding dimension and
//! rejects vectors of any other size.

use std::sync::Arc;

use ragdemo_common::Result;

pub mod embedding;
pub mod sqlite;
pub mod store;
pub mod types;

pub use embedding::{Embedder, EmbeddingService, OllamaEmbedder, build_embedder};
pub use sqlite::SqliteVectorStore;
pub use store::{InMemoryVectorStore, VectorStore};
pub use types::{
    CreateOption, EmbeddingConfig, EmbeddingMatch, EmbeddingProvider, SearchRequest,
    StoreBackend, StoreConfig,
};

/// Opens the configured store for vectors of `dimension` components.
pub fn open_store(config: &StoreConfig, dimension: usize) -> Result<Arc<dyn VectorStore>> {
    match config.backend {
        StoreBackend::Sqlite => Ok(Arc::new(SqliteVectorStore::open(config, dimension)?)),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store; embeddings will not survive a restart");
            Ok(Arc::new(InMemoryVectorStore::new(dimension)))
        }
    }
}
