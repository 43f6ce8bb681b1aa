//! Search engine that owns the vector and text stores.
//!
//! Both stores sit behind a single reader-writer lock and are only ever
//! mutated together, so every reader sees either all or none of an ingested
//! batch. Embedding runs before the lock is taken.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::index::{IndexPersistence, TextStore};
use crate::vector::{EmbeddingGenerator, VectorDimension, VectorId, VectorStore};

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: VectorId,
    pub text: String,
    pub score: f32,
}

/// The pair of stores guarded as one unit.
#[derive(Debug, Default)]
struct IndexState {
    vectors: VectorStore,
    texts: TextStore,
}

/// Exact similarity search over embedded texts.
pub struct SearchEngine {
    embedder: Arc<dyn EmbeddingGenerator>,
    state: RwLock<IndexState>,
    defaults: SearchConfig,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state.try_read() {
            Some(state) => f
                .debug_struct("SearchEngine")
                .field("model", &self.embedder.model_name())
                .field("entries", &state.vectors.len())
                .field("dimension", &state.vectors.dimension())
                .finish(),
            None => write!(f, "SearchEngine {{ <locked> }}"),
        }
    }
}

impl SearchEngine {
    /// Create an empty engine.
    pub fn new(embedder: Arc<dyn EmbeddingGenerator>) -> Self {
        Self {
            embedder,
            state: RwLock::new(IndexState::default()),
            defaults: SearchConfig::default(),
        }
    }

    /// Create an engine restored from the index at `path`.
    ///
    /// Starts empty when no index exists there yet.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn EmbeddingGenerator>) -> SearchResult<Self> {
        let engine = Self::new(embedder);
        engine.load(path)?;
        Ok(engine)
    }

    /// Override the `top_k` / `threshold` used by [`Self::search_with_defaults`].
    #[must_use]
    pub fn with_search_config(mut self, config: SearchConfig) -> Self {
        self.defaults = config;
        self
    }

    /// Embed and index a batch of texts.
    ///
    /// The whole batch is embedded with one provider call. The batch is
    /// appended all-or-nothing: when any vector is rejected neither store
    /// changes. Returns the ids assigned to the texts, in input order.
    pub fn ingest<S: AsRef<str>>(&self, texts: &[S]) -> SearchResult<Vec<VectorId>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let embeddings = self.embedder.generate_embeddings(&texts)?;
        if embeddings.len() != texts.len() {
            return Err(SearchError::Embedding(format!(
                "expected {} embeddings from {}, got {}",
                texts.len(),
                self.embedder.model_name(),
                embeddings.len()
            )));
        }

        let mut state = self.state.write();
        let ids = state.vectors.append_batch(&embeddings).inspect_err(|e| {
            tracing::warn!("rejected batch of {} texts: {}", texts.len(), e.status_code());
        })?;
        for text in texts {
            state.texts.append(text);
        }
        debug_assert_eq!(state.vectors.len(), state.texts.len());

        tracing::debug!(
            "indexed {} texts, {} entries total",
            ids.len(),
            state.vectors.len()
        );
        Ok(ids)
    }

    /// Find the indexed texts most similar to `query`.
    ///
    /// Keeps entries scoring at least `threshold`, orders them by score
    /// descending with ties in ascending id order, and returns at most
    /// `top_k`. An empty index yields no results.
    pub fn search(&self, query: &str, top_k: usize, threshold: f32) -> SearchResult<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .generate_embeddings(&[query])?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Embedding("no embedding returned for query".to_string()))?;

        let state = self.state.read();
        let scores = match state.vectors.score_all(&query_embedding) {
            Ok(scores) => scores,
            Err(SearchError::EmptyIndex) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        rank(scores, top_k, threshold)
            .into_iter()
            .map(|(id, score)| {
                Ok(SearchHit {
                    id,
                    text: state.texts.get(id)?.to_string(),
                    score,
                })
            })
            .collect()
    }

    /// [`Self::search`] with the configured default `top_k` and `threshold`.
    pub fn search_with_defaults(&self, query: &str) -> SearchResult<Vec<SearchHit>> {
        self.search(query, self.defaults.top_k, self.defaults.threshold)
    }

    /// Persist the index to `path` and its companion text file.
    pub fn save(&self, path: impl AsRef<Path>) -> SearchResult<()> {
        let state = self.state.read();
        IndexPersistence::new(path.as_ref()).save(&state.vectors, &state.texts)
    }

    /// Replace the in-memory index with the one stored at `path`.
    ///
    /// On error the current contents are left untouched.
    pub fn load(&self, path: impl AsRef<Path>) -> SearchResult<()> {
        let (vectors, texts) = IndexPersistence::new(path.as_ref()).load()?;
        *self.state.write() = IndexState { vectors, texts };
        Ok(())
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension learned from the first indexed vector.
    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.state.read().vectors.dimension()
    }

    /// Name of the embedding model in use.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}

/// Filter by threshold, order by score descending then id ascending, keep `top_k`.
///
/// When fewer than all candidates are wanted, a selection pass isolates the
/// best `top_k` before sorting only those.
pub fn rank(mut scored: Vec<(VectorId, f32)>, top_k: usize, threshold: f32) -> Vec<(VectorId, f32)> {
    if top_k == 0 {
        return Vec::new();
    }

    // NaN never satisfies the comparison, so it is dropped here.
    scored.retain(|(_, score)| *score >= threshold);

    if top_k < scored.len() {
        scored.select_nth_unstable_by(top_k - 1, compare_ranked);
        scored.truncate(top_k);
    }
    scored.sort_unstable_by(compare_ranked);
    scored
}

fn compare_ranked(a: &(VectorId, f32), b: &(VectorId, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}
