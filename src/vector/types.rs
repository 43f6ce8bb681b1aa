//! Type-safe wrappers and core types for the vector index.
//!
//! Newtypes here keep raw integers out of the public API so ids and
//! dimensions cannot be mixed up at call sites.

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

/// Identifier of an indexed entry.
///
/// Ids are dense and zero-based: the id of an entry is its insertion
/// position, shared by the vector store and the text store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(u64);

impl VectorId {
    /// Creates a new `VectorId`.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Position of this entry in the backing stores.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u64)
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent
/// dimension mismatches during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> SearchResult<Self> {
        if dim == 0 {
            return Err(SearchError::InvalidDimension { dimension: 0 });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> SearchResult<()> {
        if vector.len() != self.0 {
            return Err(SearchError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
