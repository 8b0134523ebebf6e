//! Retrieval-augmented question answering.

use std::sync::Arc;

use async_trait::async_trait;
use ragdemo_common::Result;
use ragdemo_llm::LlmClient;
use tracing::{info, instrument};

use crate::retrieval::EmbeddingStoreContentRetriever;

/// Answers a single question.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn chat(&self, question: &str) -> Result<String>;
}

pub struct RagAssistant {
    llm: Arc<dyn LlmClient>,
    retriever: EmbeddingStoreContentRetriever,
}

impl RagAssistant {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: EmbeddingStoreContentRetriever) -> Self {
        Self { llm, retriever }
    }
}

#[async_trait]
impl Assistant for RagAssistant {
    #[instrument(skip(self))]
    async fn chat(&self, question: &str) -> Result<String> {
        let matches = self.retriever.retrieve(question).await?;
        let contents: Vec<&str> = matches.iter().map(|m| m.segment.text()).collect();
        info!(contents = contents.len(), "Augmenting question");

        let prompt = augment(question, &contents);
        self.llm.generate(None, &prompt, &[]).await
    }
}

/// Appends retrieved contents to the question. Without contents the question
/// is returned unchanged.
pub fn augment(question: &str, contents: &[&str]) -> String {
    if contents.is_empty() {
        return question.to_string();
    }
    format!(
        "{question}\n\nAnswer using the following information:\n{}",
        contents.join("\n\n")
    )
}
