//! Settings loaded from disk and environment drive the engine defaults

use std::path::PathBuf;
use std::sync::Arc;

use semdex::{SearchEngine, Settings};

use crate::common::{CATS_CORPUS, KeywordEmbedder};

#[test]
fn test_file_and_env_settings_reach_the_engine() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "settings.toml",
            r#"
index_path = "data/texts.vec"

[search]
top_k = 3
threshold = 0.9
"#,
        )?;
        jail.set_env("SEMDEX_SEARCH__THRESHOLD", "-1.0");

        let settings = Settings::load_from("settings.toml").map_err(|e| *e)?;
        assert_eq!(settings.index_path, PathBuf::from("data/texts.vec"));
        assert_eq!(settings.search.top_k, 3);
        assert_eq!(settings.search.threshold, -1.0);

        let engine = SearchEngine::open(&settings.index_path, Arc::new(KeywordEmbedder::new()))
            .map_err(|e| figment::Error::from(e.to_string()))?
            .with_search_config(settings.search);
        engine
            .ingest(&CATS_CORPUS)
            .map_err(|e| figment::Error::from(e.to_string()))?;

        let hits = engine
            .search_with_defaults("anything")
            .map_err(|e| figment::Error::from(e.to_string()))?;
        assert_eq!(hits.len(), 3);

        engine
            .save(&settings.index_path)
            .map_err(|e| figment::Error::from(e.to_string()))?;
        assert!(jail.directory().join("data/texts.vec").exists());
        assert!(jail.directory().join("data/texts.vec.txt").exists());
        Ok(())
    });
}
