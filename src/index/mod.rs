//! The text index: aligned vector and text stores, search, and persistence.
//!
//! [`SearchEngine`] is the entry point. It owns one [`crate::vector::VectorStore`]
//! and one [`TextStore`], and entry `i` of each always describes the same text.

mod engine;
mod persist;
mod texts;

pub use engine::{SearchEngine, SearchHit, rank};
pub use persist::{IndexPersistence, TEXTS_SUFFIX, companion_path};
pub use texts::TextStore;
