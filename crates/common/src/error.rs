//! Error types for ragdemo.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RagError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            RagError::GenerationFailed(_) => "GENERATION_FAILED",
            RagError::Store(_) => "STORE_ERROR",
            RagError::Document(_) => "DOCUMENT_ERROR",
            RagError::Config(_) => "CONFIG_ERROR",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::Io(_) => "IO_ERROR",
            RagError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_message() {
        let err = RagError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 768"
        );
        assert_eq!(err.code(), "DIMENSION_MISMATCH");
    }

    #[test]
    fn io_errors_convert() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
        assert_eq!(err.code(), "IO_ERROR");
    }
}
