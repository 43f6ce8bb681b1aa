/// The main library module for semdex
pub mod config;
pub mod error;
pub mod index;
pub mod vector;

// Explicit exports for better API clarity
pub use config::{EmbeddingConfig, SearchConfig, Settings};
pub use error::{SearchError, SearchResult};
pub use index::{IndexPersistence, SearchEngine, SearchHit, TextStore};
pub use vector::{
    EmbeddingGenerator, FastEmbedGenerator, VectorDimension, VectorId, VectorStore,
};
