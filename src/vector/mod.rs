//! Vector storage and embedding generation.
//!
//! Vectors are kept in one contiguous buffer and scored exhaustively with
//! dot products. The embedding model sits behind [`EmbeddingGenerator`] so the
//! index never depends on a concrete model.

mod embedding;
mod store;
mod types;

#[cfg(test)]
pub use embedding::MockEmbeddingGenerator;
pub use embedding::{
    EmbeddingGenerator, FastEmbedGenerator, models_dir, normalize, parse_embedding_model,
};
pub use store::{VectorStore, dot_product};
pub use types::{VectorDimension, VectorId};
