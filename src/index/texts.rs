//! Source texts, positionally aligned with the vector store.

use crate::error::{SearchError, SearchResult};
use crate::vector::VectorId;

/// Append-only list of indexed texts. Entry `i` belongs to vector `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStore {
    texts: Vec<String>,
}

impl TextStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_texts(texts: Vec<String>) -> Self {
        Self { texts }
    }

    /// Appends a text and returns its id.
    pub fn append(&mut self, text: impl Into<String>) -> VectorId {
        let id = VectorId::from_index(self.texts.len());
        self.texts.push(text.into());
        id
    }

    /// Looks up the text stored under `id`.
    pub fn get(&self, id: VectorId) -> SearchResult<&str> {
        self.texts
            .get(id.index())
            .map(String::as_str)
            .ok_or(SearchError::IdOutOfRange {
                id: id.get(),
                len: self.texts.len(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// All texts in id order.
    #[must_use]
    pub fn all(&self) -> &[String] {
        &self.texts
    }
}
