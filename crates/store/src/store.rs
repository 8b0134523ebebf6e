//! Vector store abstraction and the in-memory implementation.

use async_trait::async_trait;
use ragdemo_common::{Embedding, RagError, Result, TextSegment};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::types::{EmbeddingMatch, SearchRequest};

/// Persists (embedding, segment) pairs and answers nearest-neighbour queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends a record and returns its newly assigned id.
    async fn add(&self, embedding: Embedding, segment: TextSegment) -> Result<String>;

    /// Appends records pairwise. Lengths must match.
    async fn add_all(
        &self,
        embeddings: Vec<Embedding>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<String>>;

    /// Up to `max_results` records, most relevant first. Ties keep insertion order.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<EmbeddingMatch>>;

    /// Removes every record, returning how many were removed.
    async fn delete_all(&self) -> Result<u64>;

    async fn count(&self) -> Result<u64>;

    /// Dimensionality every stored embedding must have.
    fn dimension(&self) -> usize;
}

pub(crate) fn check_dimension(expected: usize, embedding: &Embedding) -> Result<()> {
    if embedding.dimension() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: embedding.dimension(),
        });
    }
    Ok(())
}

pub(crate) fn check_batch(embeddings: &[Embedding], segments: &[TextSegment]) -> Result<()> {
    if embeddings.len() != segments.len() {
        return Err(RagError::Store(format!(
            "{} embeddings supplied for {} segments",
            embeddings.len(),
            segments.len()
        )));
    }
    Ok(())
}

/// Scores candidates (given in insertion order) and keeps the best `max_results`.
pub(crate) fn rank<I>(request: &SearchRequest, candidates: I) -> Vec<EmbeddingMatch>
where
    I: IntoIterator<Item = (String, Embedding, TextSegment)>,
{
    if request.max_results == 0 {
        return Vec::new();
    }

    let mut matches: Vec<EmbeddingMatch> = candidates
        .into_iter()
        .map(|(id, embedding, segment)| EmbeddingMatch {
            score: request.query.relevance_score(&embedding),
            id,
            embedding,
            segment,
        })
        .filter(|m| m.score >= request.min_score)
        .collect();

    // Stable sort, so equal scores stay in insertion order
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(request.max_results);
    matches
}

struct Record {
    id: String,
    embedding: Embedding,
    segment: TextSegment,
}

/// Non-durable store holding records in insertion order.
pub struct InMemoryVectorStore {
    dimension: usize,
    records: RwLock<Vec<Record>>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, embedding: Embedding, segment: TextSegment) -> Result<String> {
        check_dimension(self.dimension, &embedding)?;
        let id = Uuid::new_v4().to_string();
        debug!(id = %id, "Adding record");
        self.records.write().await.push(Record {
            id: id.clone(),
            embedding,
            segment,
        });
        Ok(id)
    }

    async fn add_all(
        &self,
        embeddings: Vec<Embedding>,
        segments: Vec<TextSegment>,
    ) -> Result<Vec<String>> {
        check_batch(&embeddings, &segments)?;
        for embedding in &embeddings {
            check_dimension(self.dimension, embedding)?;
        }

        let mut records = self.records.write().await;
        let ids: Vec<String> = embeddings
            .into_iter()
            .zip(segments)
            .map(|(embedding, segment)| {
                let id = Uuid::new_v4().to_string();
                records.push(Record {
                    id: id.clone(),
                    embedding,
                    segment,
                });
                id
            })
            .collect();
        debug!(count = ids.len(), "Added records");
        Ok(ids)
    }

    #[instrument(skip(self, request), fields(max_results = request.max_results))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<EmbeddingMatch>> {
        check_dimension(self.dimension, &request.query)?;
        let records = self.records.read().await;
        let matches = rank(
            request,
            records
                .iter()
                .map(|r| (r.id.clone(), r.embedding.clone(), r.segment.clone())),
        );
        debug!(candidates = records.len(), matches = matches.len(), "Searched store");
        Ok(matches)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        debug!(removed, "Deleted all records");
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
