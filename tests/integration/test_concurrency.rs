//! Readers and writers sharing one engine across threads

use std::sync::Arc;
use std::thread;

use semdex::SearchEngine;

use crate::common::{KeywordEmbedder, TempIndex};

const WRITERS: usize = 4;
const BATCHES_PER_WRITER: usize = 25;

#[test]
fn test_searches_never_observe_partial_batches() {
    let engine = SearchEngine::new(Arc::new(KeywordEmbedder::new()));

    thread::scope(|scope| {
        for writer in 0..WRITERS {
            let engine = &engine;
            scope.spawn(move || {
                for batch in 0..BATCHES_PER_WRITER {
                    engine
                        .ingest(&[
                            format!("cat {writer}-{batch}"),
                            format!("dog {writer}-{batch}"),
                        ])
                        .unwrap();
                }
            });
        }

        for _ in 0..4 {
            let engine = &engine;
            scope.spawn(move || {
                for _ in 0..50 {
                    let hits = engine.search("cat", usize::MAX, -1.0).unwrap();
                    assert_eq!(hits.len() % 2, 0, "saw a torn batch");
                    for hit in &hits {
                        // Every id resolves to the text stored with it
                        let pair_start = hit.id.index() - hit.id.index() % 2;
                        let expected_prefix = if hit.id.index() == pair_start {
                            "cat "
                        } else {
                            "dog "
                        };
                        assert!(hit.text.starts_with(expected_prefix));
                    }
                }
            });
        }
    });

    assert_eq!(engine.len(), WRITERS * BATCHES_PER_WRITER * 2);
}

#[test]
fn test_save_while_ingesting_writes_a_consistent_pair() {
    let temp = TempIndex::new();
    let engine = SearchEngine::new(Arc::new(KeywordEmbedder::new()));
    engine.ingest(&["seed turtle"]).unwrap();

    thread::scope(|scope| {
        let writer = &engine;
        scope.spawn(move || {
            for i in 0..50 {
                writer.ingest(&[format!("cat {i}")]).unwrap();
            }
        });

        for _ in 0..10 {
            engine.save(temp.path()).unwrap();
            let reloaded =
                SearchEngine::open(temp.path(), Arc::new(KeywordEmbedder::new())).unwrap();
            assert!(!reloaded.is_empty());
        }
    });
}
