//! Embedding-store ingestion: transform, split, embed, store.

use std::sync::Arc;

use ragdemo_common::{RagError, Result};
use ragdemo_store::{Embedder, VectorStore};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::document::{Document, HtmlToTextTransformer};
use crate::splitter::DocumentSplitter;

/// Which document to ingest and how to split it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Path, `file:` URL, or `http(s)://` URL
    pub document: String,
    pub max_segment_chars: usize,
    pub overlap_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            document: "demos/obacle-2024-10-K.html".to_string(),
            max_segment_chars: 300,
            overlap_chars: 30,
        }
    }
}

impl IngestConfig {
    pub fn splitter(&self) -> Result<DocumentSplitter> {
        DocumentSplitter::recursive(self.max_segment_chars, self.overlap_chars)
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub segments: usize,
    pub ids: Vec<String>,
}

pub struct EmbeddingStoreIngestor {
    transformer: Option<HtmlToTextTransformer>,
    splitter: DocumentSplitter,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl EmbeddingStoreIngestor {
    pub fn builder() -> EmbeddingStoreIngestorBuilder {
        EmbeddingStoreIngestorBuilder::default()
    }

    /// Runs the whole pipeline. Records already added are kept if a later
    /// step fails.
    #[instrument(skip_all, fields(chars = document.text.len()))]
    pub async fn ingest(&self, document: Document) -> Result<IngestSummary> {
        let document = match &self.transformer {
            Some(transformer) => transformer.transform(document),
            None => document,
        };

        let segments = self.splitter.split(&document);
        if segments.is_empty() {
            info!("Document produced no segments");
            return Ok(IngestSummary {
                segments: 0,
                ids: Vec::new(),
            });
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text().to_string()).collect();
        let embeddings = self.embedder.embed_all(&texts).await?;
        let ids = self.store.add_all(embeddings, segments).await?;

        info!(segments = ids.len(), "Ingested document");
        Ok(IngestSummary {
            segments: ids.len(),
            ids,
        })
    }
}

#[derive(Default)]
pub struct EmbeddingStoreIngestorBuilder {
    transformer: Option<HtmlToTextTransformer>,
    splitter: Option<DocumentSplitter>,
    embedder: Option<Arc<dyn Embedder>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl EmbeddingStoreIngestorBuilder {
    pub fn document_transformer(mut self, transformer: HtmlToTextTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn document_splitter(mut self, splitter: DocumentSplitter) -> Self {
        self.splitter = Some(splitter);
        self
    }

    pub fn embedding_model(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn embedding_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<EmbeddingStoreIngestor> {
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::Config("ingestor requires an embedding model".into()))?;
        let store = self
            .store
            .ok_or_else(|| RagError::Config("ingestor requires an embedding store".into()))?;
        if embedder.dimension() != store.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }
        let splitter = match self.splitter {
            Some(splitter) => splitter,
            None => IngestConfig::default().splitter()?,
        };

        Ok(EmbeddingStoreIngestor {
            transformer: self.transformer,
            splitter,
            embedder,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragdemo_common::Embedding;
    use ragdemo_store::{InMemoryVectorStore, SearchRequest};

    /// Embeds by counting a few characters.
    struct CharCountEmbedder;

    #[async_trait]
    impl Embedder for CharCountEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding> {
            let count = |c: char| text.chars().filter(|x| *x == c).count() as f32;
            Ok(Embedding::new(vec![count('a') + 1.0, count('e'), count('o')]))
        }
        fn dimension(&self) -> usize {
            3
        }
        fn model_name(&self) -> &str {
            "char-count"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding> {
            Err(RagError::ModelUnavailable("offline".into()))
        }
        fn dimension(&self) -> usize {
            3
        }
        fn model_name(&self) -> &str {
            "offline"
        }
    }

    fn report() -> Document {
        let mut doc = Document::from(
            "<html><body><h1>Annual Report</h1>\
             <p>oBacle had many employees in the United States.</p>\
             <script>var ignored = 1;</script>\
             <p>Revenue grew across all cloud services in fiscal 2023.</p></body></html>",
        );
        doc.metadata.insert("file_name".into(), "report.html".into());
        doc
    }

    #[tokio::test]
    async fn ingests_html_into_store() {
        let store = Arc::new(InMemoryVectorStore::new(3));
        let ingestor = EmbeddingStoreIngestor::builder()
            .document_transformer(HtmlToTextTransformer)
            .document_splitter(DocumentSplitter::recursive(60, 10).unwrap())
            .embedding_model(Arc::new(CharCountEmbedder))
            .embedding_store(store.clone())
            .build()
            .unwrap();

        let summary = ingestor.ingest(report()).await.unwrap();
        assert!(summary.segments >= 2);
        assert_eq!(summary.ids.len(), summary.segments);
        assert_eq!(store.count().await.unwrap(), summary.segments as u64);

        let matches = store
            .search(&SearchRequest::new(Embedding::new(vec![1.0, 1.0, 1.0]), 10))
            .await
            .unwrap();
        for m in &matches {
            assert!(!m.segment.text().contains('<'));
            assert!(!m.segment.text().contains("ignored"));
            assert_eq!(m.segment.metadata_value("file_name"), Some("report.html"));
            assert!(m.segment.metadata_value("index").is_some());
        }
    }

    #[tokio::test]
    async fn blank_document_ingests_nothing() {
        let store = Arc::new(InMemoryVectorStore::new(3));
        let ingestor = EmbeddingStoreIngestor::builder()
            .embedding_model(Arc::new(CharCountEmbedder))
            .embedding_store(store.clone())
            .build()
            .unwrap();

        let summary = ingestor.ingest(Document::from("   \n\n ")).await.unwrap();
        assert_eq!(summary.segments, 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn embedding_failure_stores_nothing() {
        let store = Arc::new(InMemoryVectorStore::new(3));
        let ingestor = EmbeddingStoreIngestor::builder()
            .embedding_model(Arc::new(FailingEmbedder))
            .embedding_store(store.clone())
            .build()
            .unwrap();

        let err = ingestor.ingest(report()).await.unwrap_err();
        assert!(matches!(err, RagError::ModelUnavailable(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn builder_requires_embedder_and_store() {
        assert!(matches!(
            EmbeddingStoreIngestor::builder().build(),
            Err(RagError::Config(_))
        ));
        assert!(matches!(
            EmbeddingStoreIngestor::builder()
                .embedding_model(Arc::new(CharCountEmbedder))
                .build(),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn builder_rejects_dimension_mismatch() {
        let result = EmbeddingStoreIngestor::builder()
            .embedding_model(Arc::new(CharCountEmbedder))
            .embedding_store(Arc::new(InMemoryVectorStore::new(384)))
            .build();
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }

    #[test]
    fn config_defaults_and_partial_toml() {
        let config: IngestConfig = toml::from_str("overlap_chars = 50").unwrap();
        assert_eq!(config.max_segment_chars, 300);
        assert_eq!(config.overlap_chars, 50);
        assert_eq!(config.document, "demos/obacle-2024-10-K.html");
        assert!(config.splitter().is_ok());

        let bad = IngestConfig {
            overlap_chars: 300,
            ..Default::default()
        };
        assert!(bad.splitter().is_err());
    }
}
