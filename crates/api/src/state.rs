//! Application state for the API server.

use std::sync::Arc;
use std::time::Instant;

use ragdemo_common::Result;
use ragdemo_llm::{LlmClient, build_llm_client};
use ragdemo_rag::{Assistant, EmbeddingStoreContentRetriever, RagAssistant};
use ragdemo_store::{Embedder, VectorStore, build_embedder, open_store};
use tracing::info;

use crate::config::AppConfig;

/// Shared application state, built once at startup.
pub struct AppState {
    pub chat: Arc<dyn LlmClient>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
    pub assistant: Arc<dyn Assistant>,
    pub config: AppConfig,

    /// Server start time (for health checks)
    pub start_time: Instant,
}

impl AppState {
    /// Builds the chat client, embedder, and store described by `config`.
    pub fn new(config: AppConfig) -> Result<Self> {
        let chat = build_llm_client(&config.chat)?;
        let embedder = build_embedder(&config.embedding)?;
        let store = open_store(&config.store, embedder.dimension())?;

        info!(
            chat_model = %chat.model_name(),
            embedding_model = %embedder.model_name(),
            dimension = embedder.dimension(),
            "Initialized models and store"
        );

        Self::from_parts(config, chat, embedder, store)
    }

    /// Assembles state from already-built components.
    pub fn from_parts(
        config: AppConfig,
        chat: Arc<dyn LlmClient>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let retriever =
            EmbeddingStoreContentRetriever::new(embedder.clone(), store.clone(), &config.retrieval)?;
        let assistant: Arc<dyn Assistant> = Arc::new(RagAssistant::new(chat.clone(), retriever));

        Ok(Self {
            chat,
            embedder,
            store,
            assistant,
            config,
            start_time: Instant::now(),
        })
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
