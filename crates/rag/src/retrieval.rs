//! Content retrieval from an embedding store.

use std::sync::Arc;

use ragdemo_common::{RagError, Result};
use ragdemo_store::{Embedder, EmbeddingMatch, SearchRequest, VectorStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub max_results: usize,
    /// Relevance floor in `[0, 1]`
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: 3,
            min_score: 0.0,
        }
    }
}

/// Embeds a query and returns the closest stored segments.
pub struct EmbeddingStoreContentRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    max_results: usize,
    min_score: f32,
}

impl EmbeddingStoreContentRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        if config.max_results == 0 {
            return Err(RagError::Config("max_results must be positive".into()));
        }
        if !(0.0..=1.0).contains(&config.min_score) {
            return Err(RagError::Config(format!(
                "min_score must be within [0, 1], got {}",
                config.min_score
            )));
        }
        Ok(Self {
            embedder,
            store,
            max_results: config.max_results,
            min_score: config.min_score,
        })
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<EmbeddingMatch>> {
        let embedding = self.embedder.embed(query).await?;
        let request =
            SearchRequest::new(embedding, self.max_results).with_min_score(self.min_score);
        let matches = self.store.search(&request).await?;
        debug!(found = matches.len(), "Retrieved content");
        Ok(matches)
    }
}
