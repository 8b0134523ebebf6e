//! End-to-end ingestion and answering over a SQLite store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragdemo_common::{Embedding, Result, TextSegment};
use ragdemo_llm::{LlmClient, LlmRequest, LlmResponse};
use ragdemo_rag::{
    Assistant, DocumentSplitter, EmbeddingStoreContentRetriever, EmbeddingStoreIngestor,
    HtmlToTextTransformer, RagAssistant, RetrievalConfig, load_document,
};
use ragdemo_store::{Embedder, SearchRequest, SqliteVectorStore, StoreConfig, VectorStore};
use tempfile::TempDir;

/// Scores text against four concept axes: fruit, technology, food, games.
struct ConceptEmbedder;

const CONCEPTS: &[(&str, [f32; 4])] = &[
    ("fruit", [1.0, 0.0, 0.0, 0.0]),
    ("banana", [1.0, 0.0, 0.3, 0.0]),
    ("apple", [1.0, 0.2, 0.3, 0.0]),
    ("strawberry", [1.0, 0.0, 0.2, 0.0]),
    ("computer", [0.0, 1.0, 0.0, 0.0]),
    ("pizza", [0.1, 0.0, 1.0, 0.0]),
    ("chess", [0.0, 0.1, 0.0, 1.0]),
    ("employ", [0.0, 0.5, 0.0, 0.5]),
    ("people", [0.0, 0.5, 0.0, 0.5]),
];

#[async_trait]
impl Embedder for ConceptEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let lower = text.to_lowercase();
        let mut v = [0.01_f32; 4];
        for (word, axes) in CONCEPTS {
            if lower.contains(word) {
                for (slot, axis) in v.iter_mut().zip(axes) {
                    *slot += axis;
                }
            }
        }
        Ok(Embedding::new(v.to_vec()))
    }
    fn dimension(&self) -> usize {
        4
    }
    fn model_name(&self) -> &str {
        "concepts"
    }
}

struct ScriptedClient {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        if let Some(last) = request.messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        Ok(LlmResponse {
            content: self.answer.clone(),
            model: "scripted".into(),
            usage: None,
            finish_reason: Some("stop".into()),
        })
    }
    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn sqlite_store(dir: &TempDir) -> Arc<dyn VectorStore> {
    let config = StoreConfig {
        db_path: dir.path().join("embeddings.db"),
        ..Default::default()
    };
    Arc::new(SqliteVectorStore::open(&config, 4).unwrap())
}

#[tokio::test]
async fn fruit_query_ranks_fruits_first() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir);
    let embedder = ConceptEmbedder;

    for word in ["banana", "computer", "apple", "pizza", "strawberry", "chess"] {
        let embedding = embedder.embed(word).await.unwrap();
        store.add(embedding, TextSegment::from(word)).await.unwrap();
    }

    let query = embedder.embed("fruit").await.unwrap();
    let matches = store.search(&SearchRequest::new(query, 3)).await.unwrap();
    let mut texts: Vec<_> = matches.iter().map(|m| m.segment.text()).collect();
    texts.sort();
    assert_eq!(texts, vec!["apple", "banana", "strawberry"]);
}

#[tokio::test]
async fn ingest_report_then_answer() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.html");
    std::fs::write(
        &report,
        "<html><head><title>10-K</title></head><body>\
         <h2>Human Capital</h2>\
         <p>As of May 31, 2023, oBacle employed approximately 47,000 people in the United States.</p>\
         <h2>Products</h2><p>Our cloud computer services grew strongly.</p>\
         </body></html>",
    )
    .unwrap();

    let embedder: Arc<dyn Embedder> = Arc::new(ConceptEmbedder);
    let store = sqlite_store(&dir);

    let ingestor = EmbeddingStoreIngestor::builder()
        .document_transformer(HtmlToTextTransformer)
        .document_splitter(DocumentSplitter::recursive(300, 30).unwrap())
        .embedding_model(embedder.clone())
        .embedding_store(store.clone())
        .build()
        .unwrap();

    let document = load_document(&format!("file:{}", report.display())).await.unwrap();
    let summary = ingestor.ingest(document).await.unwrap();
    assert!(summary.segments >= 1);
    assert_eq!(store.count().await.unwrap(), summary.segments as u64);

    let client = Arc::new(ScriptedClient {
        answer: "About 47,000.".into(),
        prompts: Mutex::new(Vec::new()),
    });
    let retriever =
        EmbeddingStoreContentRetriever::new(embedder, store, &RetrievalConfig::default()).unwrap();
    let assistant = RagAssistant::new(client.clone(), retriever);

    let answer = assistant
        .chat("How many people are employed by oBacle in the US in 2023?")
        .await
        .unwrap();
    assert_eq!(answer, "About 47,000.");

    let prompts = client.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Answer using the following information:"));
    assert!(prompts[0].contains("47,000 people"));
}
