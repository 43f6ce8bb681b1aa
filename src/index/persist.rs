//! Flat-file persistence for the vector and text stores.
//!
//! # Storage Format
//!
//! An index is stored as two artifacts sharing a base path:
//! - `<path>`: binary vector file
//!   - Header (16 bytes): magic `SDXV`, version, dimension, vector count
//!   - Vectors: contiguous f32 values in little-endian format, id order
//! - `<path>.txt`: JSON array of the indexed texts, id order
//!
//! Each artifact is written to a temporary file next to its destination and
//! renamed into place, so a single artifact is never observed half-written.
//! The pair is not updated atomically: a crash between the two renames leaves
//! a new text file next to an old vector file. Loading detects this when the
//! counts disagree.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tempfile::NamedTempFile;

use crate::error::{SearchError, SearchResult};
use crate::index::TextStore;
use crate::vector::{VectorDimension, VectorStore};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector files.
const MAGIC_BYTES: &[u8; 4] = b"SDXV";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Suffix appended to the vector file path to name the text file.
pub const TEXTS_SUFFIX: &str = ".txt";

/// Reads and writes an index at a fixed base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPersistence {
    path: PathBuf,
}

impl IndexPersistence {
    /// Create persistence for the vector file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the binary vector file.
    #[must_use]
    pub fn vectors_path(&self) -> &Path {
        &self.path
    }

    /// Path of the companion text file.
    #[must_use]
    pub fn texts_path(&self) -> PathBuf {
        companion_path(&self.path)
    }

    /// Returns true when both artifacts are present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists() && self.texts_path().exists()
    }

    /// Write both stores to disk.
    ///
    /// The text file is written first, then the vector file.
    pub fn save(&self, vectors: &VectorStore, texts: &TextStore) -> SearchResult<()> {
        if vectors.len() != texts.len() {
            return Err(SearchError::corrupt(
                &self.path,
                format!(
                    "refusing to save {} vectors with {} texts",
                    vectors.len(),
                    texts.len()
                ),
            ));
        }

        let texts_path = self.texts_path();
        let json = serde_json::to_vec(texts.all())
            .map_err(|e| SearchError::io(&texts_path, io::Error::other(e)))?;
        write_atomic(&texts_path, &json)?;

        let bytes = encode_vectors(vectors).map_err(|e| SearchError::io(&self.path, e))?;
        write_atomic(&self.path, &bytes)?;

        tracing::info!(
            "saved {} entries to {} and {}",
            vectors.len(),
            self.path.display(),
            texts_path.display()
        );
        Ok(())
    }

    /// Read both stores from disk.
    ///
    /// Returns empty stores when neither artifact exists and
    /// [`SearchError::CorruptIndex`] when only one does or when they disagree.
    pub fn load(&self) -> SearchResult<(VectorStore, TextStore)> {
        let texts_path = self.texts_path();

        match (self.path.exists(), texts_path.exists()) {
            (false, false) => {
                tracing::info!(
                    "no existing index at {}, starting empty",
                    self.path.display()
                );
                return Ok((VectorStore::new(), TextStore::new()));
            }
            (true, false) => {
                return Err(SearchError::corrupt(
                    &texts_path,
                    "text file is missing but the vector file exists",
                ));
            }
            (false, true) => {
                return Err(SearchError::corrupt(
                    &self.path,
                    "vector file is missing but the text file exists",
                ));
            }
            (true, true) => {}
        }

        let vectors = self.read_vectors()?;
        let texts = read_texts(&texts_path)?;

        if vectors.len() != texts.len() {
            return Err(SearchError::corrupt(
                &self.path,
                format!(
                    "{} vectors but {} texts in {}",
                    vectors.len(),
                    texts.len(),
                    texts_path.display()
                ),
            ));
        }

        tracing::info!(
            "loaded {} entries from {}",
            vectors.len(),
            self.path.display()
        );
        Ok((vectors, texts))
    }

    fn read_vectors(&self) -> SearchResult<VectorStore> {
        let file = File::open(&self.path).map_err(|e| SearchError::io(&self.path, e))?;
        let len = file
            .metadata()
            .map_err(|e| SearchError::io(&self.path, e))?
            .len();

        // Zero-length files cannot be mapped on every platform.
        if len < HEADER_SIZE as u64 {
            return Err(SearchError::corrupt(
                &self.path,
                "file too small to contain header",
            ));
        }

        // SAFETY: the map is read-only and dropped before this function returns.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SearchError::io(&self.path, e))?;
        decode_vectors(&mmap, &self.path)
    }
}

/// Companion path: the vector path with [`TEXTS_SUFFIX`] appended.
#[must_use]
pub fn companion_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TEXTS_SUFFIX);
    PathBuf::from(name)
}

fn encode_vectors(vectors: &VectorStore) -> io::Result<Vec<u8>> {
    let dimension = vectors.dimension().map_or(0, |d| d.get());
    let dimension = u32::try_from(dimension)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "dimension exceeds u32"))?;
    let count = u32::try_from(vectors.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "vector count exceeds u32"))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + vectors.as_slice().len() * BYTES_PER_F32);
    bytes.extend_from_slice(MAGIC_BYTES);
    bytes.extend_from_slice(&STORAGE_VERSION.to_le_bytes());
    bytes.extend_from_slice(&dimension.to_le_bytes());
    bytes.extend_from_slice(&count.to_le_bytes());
    for row in vectors.iter() {
        for value in row {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    Ok(bytes)
}

fn decode_vectors(bytes: &[u8], path: &Path) -> SearchResult<VectorStore> {
    if bytes.len() < HEADER_SIZE {
        return Err(SearchError::corrupt(path, "file too small to contain header"));
    }
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(SearchError::corrupt(path, "invalid magic bytes"));
    }

    let version = read_u32(bytes, 4);
    if version != STORAGE_VERSION {
        return Err(SearchError::corrupt(
            path,
            format!("unsupported storage version {version}, expected {STORAGE_VERSION}"),
        ));
    }

    let dimension = read_u32(bytes, 8) as usize;
    let count = read_u32(bytes, 12) as usize;
    let body = &bytes[HEADER_SIZE..];

    if dimension == 0 {
        if count != 0 || !body.is_empty() {
            return Err(SearchError::corrupt(
                path,
                format!("dimension is 0 but {count} vectors are declared"),
            ));
        }
        return Ok(VectorStore::new());
    }

    let expected = count
        .checked_mul(dimension)
        .and_then(|values| values.checked_mul(BYTES_PER_F32))
        .ok_or_else(|| SearchError::corrupt(path, "declared vector data size overflows"))?;
    if body.len() != expected {
        return Err(SearchError::corrupt(
            path,
            format!(
                "expected {expected} bytes for {count} vectors of dimension {dimension}, found {}",
                body.len()
            ),
        ));
    }

    let data = body
        .chunks_exact(BYTES_PER_F32)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(VectorStore::from_raw(Some(VectorDimension::new(dimension)?), data))
}

fn read_texts(path: &Path) -> SearchResult<TextStore> {
    let json = std::fs::read(path).map_err(|e| SearchError::io(path, e))?;
    let texts: Vec<String> = serde_json::from_slice(&json)
        .map_err(|e| SearchError::corrupt(path, format!("invalid text file: {e}")))?;
    Ok(TextStore::from_texts(texts))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> SearchResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| SearchError::io(parent, e))?;

    let mut file = NamedTempFile::new_in(parent).map_err(|e| SearchError::io(parent, e))?;
    file.write_all(bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| SearchError::io(path, e))?;
    file.persist(path)
        .map_err(|e| SearchError::io(path, e.error))?;
    Ok(())
}
