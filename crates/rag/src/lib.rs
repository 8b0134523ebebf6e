//! Document ingestion and retrieval-augmented generation.
//!
//! The pipeline has two halves. Ingestion loads a [`Document`], strips HTML
//! with [`HtmlToTextTransformer`], cuts it into overlapping segments with
//! [`DocumentSplitter`], then embeds and stores them via
//! [`EmbeddingStoreIngestor`]. Answering embeds a question, pulls the closest
//! segments with [`EmbeddingStoreContentRetriever`], and hands the augmented
//! prompt to a chat model through [`RagAssistant`].

pub mod assistant;
pub mod document;
pub mod ingest;
pub mod retrieval;
pub mod splitter;

pub use assistant::{Assistant, RagAssistant, augment};
pub use document::{Document, HtmlToTextTransformer, html_to_text, load_document, load_file, load_url};
pub use ingest::{EmbeddingStoreIngestor, EmbeddingStoreIngestorBuilder, IngestConfig, IngestSummary};
pub use retrieval::{EmbeddingStoreContentRetriever, RetrievalConfig};
pub use splitter::{DocumentSplitter, Span};
