//! The numbered demo scenarios.

use ragdemo_common::{Embedding, Result, TextSegment};
use ragdemo_llm::{ChatMemory, ConversationalChain};
use ragdemo_rag::{EmbeddingStoreIngestor, HtmlToTextTransformer, load_document};
use ragdemo_store::SearchRequest;
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

pub const MONA_LISA_QUESTION: &str = "Who painted the Mona Lisa?";
pub const FRENCH_SYSTEM_MESSAGE: &str = "I answer questions in French, in 100 words or less.";
pub const PAINTING_QUESTION: &str = "Give an explanation on how the Mona Lisa was painted.";
pub const FOLLOW_UP_QUESTION: &str = "Where can you see this painting?";
pub const SAMPLE_WORDS: [&str; 6] = ["banana", "computer", "apple", "pizza", "strawberry", "chess"];
pub const FRUIT_QUERY: &str = "fruit";
pub const EMPLOYEES_QUESTION: &str = "How many people are employed by oBacle in the US in 2023?";

const FRUIT_RESULTS: usize = 3;

/// What a scenario returns to the client.
#[derive(Debug, Clone, Serialize)]
pub struct DemoView {
    pub demo: String,
    pub demo_details: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    SimpleQuestion,
    AdvancedQuestion,
    QuestionWithMemory,
    SimpleIngestion,
    QueryVectors,
    VectorDetails,
    AdvancedIngestion,
    Rag,
    DeleteEmbeddings,
}

impl Scenario {
    pub const ALL: [Scenario; 9] = [
        Scenario::SimpleQuestion,
        Scenario::AdvancedQuestion,
        Scenario::QuestionWithMemory,
        Scenario::SimpleIngestion,
        Scenario::QueryVectors,
        Scenario::VectorDetails,
        Scenario::AdvancedIngestion,
        Scenario::Rag,
        Scenario::DeleteEmbeddings,
    ];

    pub fn from_number(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied()
    }

    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn title(self) -> &'static str {
        match self {
            Scenario::SimpleQuestion => "Simple question",
            Scenario::AdvancedQuestion => "Advanced question",
            Scenario::QuestionWithMemory => "A question with memory",
            Scenario::SimpleIngestion => "Simple data ingestion",
            Scenario::QueryVectors => "Querying the vector database",
            Scenario::VectorDetails => "Getting the vectors from the vector database",
            Scenario::AdvancedIngestion => "Advanced data ingestion",
            Scenario::Rag => "Retrieval-Augmented Generation (RAG)",
            Scenario::DeleteEmbeddings => "Delete embeddings",
        }
    }

    fn details(self, state: &AppState) -> String {
        let chat = state.chat.model_name();
        let embedding = state.embedder.model_name();
        let dimension = state.embedder.dimension();
        match self {
            Scenario::SimpleQuestion | Scenario::AdvancedQuestion => {
                format!("Using the {chat} chat language model.")
            }
            Scenario::QuestionWithMemory => format!(
                "Still using the {chat} chat language model but with context '{MONA_LISA_QUESTION}'."
            ),
            Scenario::SimpleIngestion => format!(
                "Using the {embedding} embedding model to map each word to a \
                 {dimension} dimensional vector stored in the embedding store."
            ),
            Scenario::QueryVectors | Scenario::VectorDetails => format!(
                "Using the {embedding} embedding model to turn the question into an \
                 embedding, then ranking stored vectors by cosine similarity."
            ),
            Scenario::AdvancedIngestion => format!(
                "Ingesting a private document ({}) into the embedding store.",
                state.config.ingest.document
            ),
            Scenario::Rag => format!(
                "Putting it all together: the {chat} chat language model answers with \
                 content retrieved from the embedding store through {embedding}."
            ),
            Scenario::DeleteEmbeddings => String::new(),
        }
    }

    /// Runs the scenario against `state`.
    pub async fn run(self, state: &AppState) -> Result<DemoView> {
        info!(scenario = self.number(), title = self.title(), "Running scenario");

        let (question, answer) = match self {
            Scenario::SimpleQuestion => {
                let answer = state.chat.generate(None, MONA_LISA_QUESTION, &[]).await?;
                (MONA_LISA_QUESTION.to_string(), answer)
            }
            Scenario::AdvancedQuestion => {
                let answer = state
                    .chat
                    .generate(Some(FRENCH_SYSTEM_MESSAGE), PAINTING_QUESTION, &[])
                    .await?;
                (PAINTING_QUESTION.to_string(), answer)
            }
            Scenario::QuestionWithMemory => {
                let memory = ChatMemory::with_max_messages(state.config.chat.memory_window);
                let mut chain = ConversationalChain::new(state.chat.clone(), memory);
                chain.execute(MONA_LISA_QUESTION).await?;
                let answer = chain.execute(FOLLOW_UP_QUESTION).await?;
                (FOLLOW_UP_QUESTION.to_string(), answer)
            }
            Scenario::SimpleIngestion => {
                for word in SAMPLE_WORDS {
                    let embedding = state.embedder.embed(word).await?;
                    state.store.add(embedding, TextSegment::from(word)).await?;
                }
                ("Ingesting data into the vector database".to_string(), ok())
            }
            Scenario::QueryVectors => {
                let answer = query_fruit(state, |text, _| text.to_string()).await?;
                (FRUIT_QUERY.to_string(), answer)
            }
            Scenario::VectorDetails => {
                let answer = query_fruit(state, |text, embedding| {
                    format!("{text} | {}", format_vector(embedding))
                })
                .await?;
                (FRUIT_QUERY.to_string(), answer)
            }
            Scenario::AdvancedIngestion => {
                let ingest = &state.config.ingest;
                let ingestor = EmbeddingStoreIngestor::builder()
                    .document_transformer(HtmlToTextTransformer)
                    .document_splitter(ingest.splitter()?)
                    .embedding_model(state.embedder.clone())
                    .embedding_store(state.store.clone())
                    .build()?;
                let document = load_document(&ingest.document).await?;
                ingestor.ingest(document).await?;
                ("Ingesting news about oBacle into the vector database".to_string(), ok())
            }
            Scenario::Rag => {
                let answer = state.assistant.chat(EMPLOYEES_QUESTION).await?;
                (EMPLOYEES_QUESTION.to_string(), answer)
            }
            Scenario::DeleteEmbeddings => {
                let removed = state.store.delete_all().await?;
                info!(removed, "Deleted embeddings");
                ("Delete embeddings from the vector database".to_string(), ok())
            }
        };

        Ok(DemoView {
            demo: format!("{}: {}", self.number(), self.title()),
            demo_details: self.details(state),
            question,
            answer,
        })
    }
}

fn ok() -> String {
    "OK".to_string()
}

async fn query_fruit(
    state: &AppState,
    render: impl Fn(&str, &Embedding) -> String,
) -> Result<String> {
    let query = state.embedder.embed(FRUIT_QUERY).await?;
    let matches = state
        .store
        .search(&SearchRequest::new(query, FRUIT_RESULTS))
        .await?;
    Ok(matches
        .iter()
        .map(|m| render(m.segment.text(), &m.embedding))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// `[v1, v2, ...]`
pub fn format_vector(embedding: &Embedding) -> String {
    let parts: Vec<String> = embedding.vector().iter().map(|v| format!("{v:?}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_number(scenario.number()), Some(scenario));
        }
        assert_eq!(Scenario::from_number(1), Some(Scenario::SimpleQuestion));
        assert_eq!(Scenario::from_number(9), Some(Scenario::DeleteEmbeddings));
    }

    #[test]
    fn out_of_range_numbers_are_unknown() {
        assert_eq!(Scenario::from_number(0), None);
        assert_eq!(Scenario::from_number(10), None);
    }

    #[test]
    fn vectors_render_like_a_list() {
        let embedding = Embedding::new(vec![0.5, -1.0, 0.25]);
        assert_eq!(format_vector(&embedding), "[0.5, -1.0, 0.25]");
    }
}
