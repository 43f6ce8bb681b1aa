//! Contiguous in-memory vector storage with exhaustive scoring.
//!
//! # Storage Layout
//!
//! All vectors live in a single flat `Vec<f32>`: row `i` occupies
//! `data[i * D .. (i + 1) * D]`. The row index is the entry's [`VectorId`].
//! The dimension `D` is unset until the first vector arrives and is fixed
//! from then on.
//!
//! # Scoring
//!
//! [`VectorStore::score_all`] computes the dot product of the query against
//! every row. Callers supply L2-normalized vectors, which makes the score the
//! cosine similarity in `[-1, 1]`. The store does not normalize or verify
//! normalization. The scan is O(N·D) with no pruning structure.

use rayon::prelude::*;

use crate::error::{SearchError, SearchResult};
use crate::vector::types::{VectorDimension, VectorId};

/// Append-only store of equal-length embedding vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    /// Fixed by the first successful append.
    dimension: Option<VectorDimension>,

    /// Row-major vector data, `count * dimension` values.
    data: Vec<f32>,

    /// Number of stored vectors.
    count: usize,
}

impl VectorStore {
    /// Creates an empty store with no dimension.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from decoded parts.
    ///
    /// The caller guarantees `data.len()` is a multiple of the dimension and
    /// that `data` is empty when no dimension is given.
    pub(crate) fn from_raw(dimension: Option<VectorDimension>, data: Vec<f32>) -> Self {
        let count = dimension.map_or(0, |d| data.len() / d.get());
        debug_assert_eq!(count * dimension.map_or(0, |d| d.get()), data.len());
        Self {
            dimension,
            data,
            count,
        }
    }

    /// Appends one vector and returns its id.
    ///
    /// The first vector ever appended fixes the store's dimension.
    pub fn append(&mut self, vector: &[f32]) -> SearchResult<VectorId> {
        let dimension = self.resolve_dimension(vector)?;
        dimension.validate_vector(vector)?;

        self.dimension = Some(dimension);
        self.data.extend_from_slice(vector);
        let id = VectorId::from_index(self.count);
        self.count += 1;
        Ok(id)
    }

    /// Appends a batch of vectors, all or nothing.
    ///
    /// Every vector is validated before any is stored. For an empty store the
    /// batch's first vector decides the dimension. On error the store,
    /// including its dimension, is left unchanged.
    pub fn append_batch<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> SearchResult<Vec<VectorId>> {
        let Some(first) = vectors.first() else {
            return Ok(Vec::new());
        };

        let dimension = self.resolve_dimension(first.as_ref())?;
        for vector in vectors {
            dimension.validate_vector(vector.as_ref())?;
        }

        self.dimension = Some(dimension);
        self.data.reserve(vectors.len() * dimension.get());
        for vector in vectors {
            self.data.extend_from_slice(vector.as_ref());
        }

        let start = self.count;
        self.count += vectors.len();
        Ok((start..self.count).map(VectorId::from_index).collect())
    }

    /// Scores `query` against every stored vector.
    ///
    /// Returns `(id, dot product)` pairs in id order. Fails with
    /// [`SearchError::EmptyIndex`] when nothing is stored and with
    /// [`SearchError::DimensionMismatch`] when the query has the wrong length.
    pub fn score_all(&self, query: &[f32]) -> SearchResult<Vec<(VectorId, f32)>> {
        let dimension = match self.dimension {
            Some(dimension) if self.count > 0 => dimension,
            _ => return Err(SearchError::EmptyIndex),
        };
        dimension.validate_vector(query)?;

        Ok(self
            .data
            .par_chunks_exact(dimension.get())
            .enumerate()
            .map(|(index, row)| (VectorId::from_index(index), dot_product(query, row)))
            .collect())
    }

    /// Iterates over stored vectors in id order.
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        // With no dimension the buffer is empty, so any chunk size works.
        self.data
            .chunks_exact(self.dimension.map_or(1, |d| d.get()))
    }

    /// The flat row-major buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the vector dimension, if one has been fixed.
    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    /// Returns the number of vectors stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn resolve_dimension(&self, candidate: &[f32]) -> SearchResult<VectorDimension> {
        match self.dimension {
            Some(dimension) => Ok(dimension),
            None => VectorDimension::new(candidate.len()),
        }
    }
}

/// Dot product of two equal-length vectors.
///
/// Equals cosine similarity when both inputs are L2-normalized.
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
