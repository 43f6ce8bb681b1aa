//! Error types for the search index
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing, search and persistence operations
#[derive(Error, Debug)]
pub enum SearchError {
    /// A vector disagrees with the dimension fixed by the first insert
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nSuggestion: Embeddings must contain at least one value")]
    InvalidDimension { dimension: usize },

    /// Informational: search maps this to an empty result set
    #[error("No vectors have been indexed yet\nSuggestion: Add texts before searching")]
    EmptyIndex,

    /// Text lookup past the end of the store. Indicates a broken invariant.
    #[error("Entry id {id} is out of range for {len} stored entries")]
    IdOutOfRange { id: u64, len: usize },

    #[error(
        "Index at '{path}' is corrupted: {reason}\nSuggestion: Remove the index files and re-add your texts"
    )]
    CorruptIndex { path: PathBuf, reason: String },

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    Embedding(String),

    #[error(
        "Failed to initialize embedding model: {0}\nSuggestion: Check your internet connection for the first-time model download"
    )]
    ModelInit(String),

    #[error("I/O error on '{path}': {source}\nSuggestion: Check disk space and file permissions")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SearchError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidDimension { .. } => "INVALID_DIMENSION",
            Self::EmptyIndex => "EMPTY_INDEX",
            Self::IdOutOfRange { .. } => "ID_OUT_OF_RANGE",
            Self::CorruptIndex { .. } => "CORRUPT_INDEX",
            Self::Embedding(_) => "EMBEDDING_ERROR",
            Self::ModelInit(_) => "MODEL_INIT_ERROR",
            Self::Io { .. } => "IO_ERROR",
        }
    }

    /// Helper for wrapping an I/O failure together with the file it touched.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for search index operations
pub type SearchResult<T> = Result<T, SearchError>;
