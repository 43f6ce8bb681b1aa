//! Embedding generation for the search index.
//!
//! This module provides the trait the index consumes and a fastembed-backed
//! implementation. The index treats the generator as an opaque function from
//! text to L2-normalized vectors and learns the dimension from its output.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::config::EmbeddingConfig;
use crate::error::{SearchError, SearchResult};

/// Trait for generating embeddings from text.
///
/// Implementations must be thread-safe, return one vector per input text in
/// input order, and produce equal-length L2-normalized vectors.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts.
    fn generate_embeddings(&self, texts: &[&str]) -> SearchResult<Vec<Vec<f32>>>;

    /// Human readable model name, used in diagnostics.
    fn model_name(&self) -> &str;
}

/// FastEmbed implementation of [`EmbeddingGenerator`].
///
/// Defaults to AllMiniLML6V2, which produces 384-dimensional embeddings.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    model_name: String,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model", &"<TextEmbedding>")
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Create a generator with the default AllMiniLML6V2 model.
    pub fn new() -> SearchResult<Self> {
        Self::from_config(&EmbeddingConfig::default())
    }

    /// Create a generator from the `[embedding]` settings section.
    pub fn from_config(config: &EmbeddingConfig) -> SearchResult<Self> {
        let model = parse_embedding_model(&config.model)?;
        let cache_dir = config.cache_dir.clone().unwrap_or_else(models_dir);

        tracing::debug!(
            "loading embedding model {} from {}",
            config.model,
            cache_dir.display()
        );

        let text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(config.show_download_progress),
        )
        .map_err(|e| SearchError::ModelInit(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            model_name: config.model.clone(),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> SearchResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = self
            .model
            .lock()
            .map_err(|_| {
                SearchError::Embedding(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(texts.to_vec(), None)
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        for embedding in &mut embeddings {
            normalize(embedding);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Parse a model name from the settings file into a fastembed model.
pub fn parse_embedding_model(name: &str) -> SearchResult<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "ParaphraseMLMiniLML12V2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        other => Err(SearchError::ModelInit(format!(
            "Unknown embedding model '{other}'. Supported: AllMiniLML6V2, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15, ParaphraseMLMiniLML12V2"
        ))),
    }
}

/// Scale a vector to unit L2 norm in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Global cache directory for downloaded models.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("semdex")
        .join("models")
}

/// Deterministic keyword-driven generator for unit tests.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    dimension: usize,
}

#[cfg(test)]
impl MockEmbeddingGenerator {
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> SearchResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let mut embedding = vec![0.1; self.dimension];
            if text.contains("cat") && self.dimension > 1 {
                embedding[0] = 0.9;
                embedding[1] = 0.8;
            }
            if text.contains("dog") && self.dimension > 3 {
                embedding[2] = 0.85;
                embedding[3] = 0.75;
            }
            if text.contains("great") && self.dimension > 4 {
                embedding[4] = 0.5;
            }
            if text.contains("turtle") && self.dimension > 6 {
                embedding[5] = 0.9;
                embedding[6] = 0.9;
            }
            normalize(&mut embedding);
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
