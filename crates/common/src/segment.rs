//! Text segments and embeddings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String metadata attached to documents and segments.
pub type Metadata = BTreeMap<String, String>;

/// A unit of text, either a short string or one chunk of a longer document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: Metadata,
}

impl TextSegment {
    pub fn from(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// A fixed-length vector produced by an embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self(vector)
    }

    pub fn vector(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity in `[-1, 1]`. Zero vectors have similarity 0.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = self.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = other.0.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    /// Cosine similarity rescaled to a relevance score in `[0, 1]`.
    pub fn relevance_score(&self, other: &Embedding) -> f32 {
        ((self.cosine_similarity(other) + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self(vector)
    }
}
