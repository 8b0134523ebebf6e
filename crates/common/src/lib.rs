//! Common types shared across the ragdemo crates.
//!
//! Holds the data model every stage of the pipeline passes around
//! (text segments, embeddings) and the single error type they report.

pub mod error;
pub mod segment;

pub use error::{RagError, Result};
pub use segment::{Embedding, Metadata, TextSegment};
