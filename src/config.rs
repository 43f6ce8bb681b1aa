//! Configuration module for the search index.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SEMDEX_` and use double
//! underscores to separate nested levels:
//! - `SEMDEX_SEARCH__TOP_K=3` sets `search.top_k`
//! - `SEMDEX_EMBEDDING__MODEL=BGESmallENV15` sets `embedding.model`
//! - `SEMDEX_LOG_LEVEL=debug` sets `log_level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project configuration directory.
pub const CONFIG_DIR: &str = ".semdex";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the vector file; texts live next to it with a `.txt` suffix
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded models are cached (defaults to the user cache dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Show a progress bar while the model downloads
    #[serde(default = "default_true")]
    pub show_download_progress: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Maximum number of results
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score for a result
    #[serde(default = "default_similarity_threshold")]
    pub threshold: f32,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("vector_index.vec")
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_true() -> bool {
    true
}
fn default_top_k() -> usize {
    5
}
fn default_similarity_threshold() -> f32 {
    0.7
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            log_level: default_log_level(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            threshold: default_similarity_threshold(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore
            // stays part of the field name
            .merge(Env::prefixed("SEMDEX_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the workspace config by looking for a `.semdex` directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(
        path: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = path.as_ref().to_path_buf();

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# semdex configuration file

# Version of the configuration schema
version = 1

# Vector file of the index; texts are stored next to it with a ".txt" suffix
index_path = ".semdex/vector_index.vec"

# Log filter used when RUST_LOG is not set (error, warn, info, debug, trace)
log_level = "warn"

[embedding]
# Model to use for embeddings
# Supported: AllMiniLML6V2, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15, ParaphraseMLMiniLML12V2
model = "AllMiniLML6V2"

# Show a progress bar while the model downloads
show_download_progress = true

# Where downloaded models are cached (defaults to the user cache directory)
# cache_dir = "/path/to/models"

[search]
# Maximum number of results returned by a search
top_k = 5

# Minimum similarity score (cosine, -1.0 to 1.0)
threshold = 0.7
"#;

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}
