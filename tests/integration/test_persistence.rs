//! Save/load behavior across engine instances and on-disk layout checks

use std::sync::Arc;

use semdex::index::companion_path;
use semdex::{IndexPersistence, SearchEngine, SearchError};

use crate::common::{CATS_CORPUS, KeywordEmbedder, TempIndex, cats_engine};

#[test]
fn test_reloaded_engine_answers_like_the_original() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();

    let reopened = SearchEngine::open(temp.path(), Arc::new(KeywordEmbedder::new())).unwrap();

    assert_eq!(reopened.len(), engine.len());
    assert_eq!(reopened.dimension(), engine.dimension());
    assert_eq!(
        reopened.search("I love cats", 3, -1.0).unwrap(),
        engine.search("I love cats", 3, -1.0).unwrap()
    );
}

#[test]
fn test_open_without_files_starts_empty() {
    let temp = TempIndex::new();
    let engine = SearchEngine::open(temp.path(), Arc::new(KeywordEmbedder::new())).unwrap();

    assert!(engine.is_empty());
    assert!(engine.dimension().is_none());
    assert!(!temp.path().exists());
}

#[test]
fn test_load_with_only_vector_file_is_corrupt() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();
    std::fs::remove_file(companion_path(&temp.path())).unwrap();

    let target = SearchEngine::new(Arc::new(KeywordEmbedder::new()));
    target.ingest(&["a dog"]).unwrap();

    let err = target.load(temp.path()).unwrap_err();

    assert!(matches!(err, SearchError::CorruptIndex { .. }));
    // The engine keeps what it had
    assert_eq!(target.len(), 1);
    assert_eq!(target.search("dog", 1, 0.0).unwrap()[0].text, "a dog");
}

#[test]
fn test_load_with_only_text_file_is_corrupt() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();
    std::fs::remove_file(temp.path()).unwrap();

    let err = IndexPersistence::new(temp.path()).load().unwrap_err();
    assert_eq!(err.status_code(), "CORRUPT_INDEX");
}

#[test]
fn test_vector_file_layout() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();

    let bytes = std::fs::read(temp.path()).unwrap();
    let dimension = KeywordEmbedder::dimension();

    assert_eq!(&bytes[0..4], b"SDXV");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
    assert_eq!(
        u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize,
        dimension
    );
    assert_eq!(
        u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize,
        CATS_CORPUS.len()
    );
    assert_eq!(bytes.len(), 16 + CATS_CORPUS.len() * dimension * 4);
}

#[test]
fn test_text_file_is_json_array_in_id_order() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();

    let content = std::fs::read_to_string(companion_path(&temp.path())).unwrap();
    let texts: Vec<String> = serde_json::from_str(&content).unwrap();
    assert_eq!(texts, CATS_CORPUS);
}

#[test]
fn test_saving_twice_is_byte_identical() {
    let first = TempIndex::new();
    let second = TempIndex::new();
    let (engine, _) = cats_engine();

    engine.save(first.path()).unwrap();
    engine.save(second.path()).unwrap();

    assert_eq!(
        std::fs::read(first.path()).unwrap(),
        std::fs::read(second.path()).unwrap()
    );
    assert_eq!(
        std::fs::read(companion_path(&first.path())).unwrap(),
        std::fs::read(companion_path(&second.path())).unwrap()
    );
}

#[test]
fn test_load_replaces_current_contents() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();

    let target = SearchEngine::new(Arc::new(KeywordEmbedder::new()));
    target.ingest(&["one", "two", "three", "four"]).unwrap();
    target.load(temp.path()).unwrap();

    assert_eq!(target.len(), CATS_CORPUS.len());
    let ids = target.ingest(&["a turtle"]).unwrap();
    assert_eq!(ids[0].index(), CATS_CORPUS.len());
}

#[test]
fn test_truncated_vector_file_is_corrupt() {
    let temp = TempIndex::new();
    let (engine, _) = cats_engine();
    engine.save(temp.path()).unwrap();

    let bytes = std::fs::read(temp.path()).unwrap();
    std::fs::write(temp.path(), &bytes[..bytes.len() - 4]).unwrap();

    let err = IndexPersistence::new(temp.path()).load().unwrap_err();
    assert!(matches!(err, SearchError::CorruptIndex { .. }));
}
