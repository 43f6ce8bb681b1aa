//! CLI entry point for the text similarity index.
//!
//! Provides commands for adding texts, searching, and inspecting the index.

use anyhow::{Context, Result, bail};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use semdex::config::CONFIG_DIR;
use semdex::{FastEmbedGenerator, IndexPersistence, SearchEngine, SearchHit, Settings};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(
    name = "semdex",
    version,
    about = "Exact semantic search over a local collection of texts",
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .semdex/settings.toml
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Embed texts and add them to the index
    #[command(after_help = "Examples:\n  semdex add \"cats are great\" \"dogs are great\"\n  semdex add --file notes.txt")]
    Add {
        /// Texts to add
        texts: Vec<String>,

        /// Read one text per non-empty line from this file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Find indexed texts similar to a query
    #[command(after_help = "Examples:\n  semdex search \"Tell me about BERT\"\n  semdex search \"cats\" --limit 3 --threshold 0.5 --json")]
    Search {
        /// Query text
        query: String,

        /// Maximum number of results (overrides config)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity score (overrides config)
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<f32>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show entry count, dimension, and file locations
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Serialize)]
struct IndexInfo {
    entries: usize,
    dimension: Option<usize>,
    model: String,
    vectors_path: PathBuf,
    texts_path: PathBuf,
    exists: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("failed to load configuration")?;

    init_tracing(&settings);

    match cli.command {
        Commands::Init { force } => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
            let path = Settings::init_config_file(&path, force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Created configuration at: {}", path.display());
        }
        Commands::Add { texts, file } => add(&settings, texts, file)?,
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => search(&settings, &query, limit, threshold, json)?,
        Commands::Info { json } => info(&settings, json)?,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for results and JSON.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_engine(settings: &Settings) -> Result<SearchEngine> {
    let generator = FastEmbedGenerator::from_config(&settings.embedding)?;
    let engine = SearchEngine::open(&settings.index_path, Arc::new(generator))
        .with_context(|| format!("failed to open index {}", settings.index_path.display()))?;
    Ok(engine.with_search_config(settings.search))
}

/// Positional texts followed by each non-blank, trimmed line of `content`.
fn collect_texts(mut texts: Vec<String>, content: Option<&str>) -> Vec<String> {
    if let Some(content) = content {
        texts.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    texts
}

fn add(settings: &Settings, texts: Vec<String>, file: Option<PathBuf>) -> Result<()> {
    let content = file
        .map(|path| {
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))
        })
        .transpose()?;
    let texts = collect_texts(texts, content.as_deref());
    if texts.is_empty() {
        bail!("nothing to add: pass texts as arguments or use --file");
    }

    let engine = open_engine(settings)?;
    let start = Instant::now();
    let ids = engine.ingest(&texts)?;
    engine.save(&settings.index_path)?;

    println!(
        "Added {} texts in {:.2?} ({} entries total)",
        ids.len(),
        start.elapsed(),
        engine.len()
    );
    Ok(())
}

fn search(
    settings: &Settings,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let engine = open_engine(settings)?;
    let hits = engine.search(
        query,
        limit.unwrap_or(settings.search.top_k),
        threshold.unwrap_or(settings.search.threshold),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results above the similarity threshold.");
    } else {
        println!("{}", results_table(&hits));
    }
    Ok(())
}

fn results_table(hits: &[SearchHit]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Score", "Text"]);

    for (rank, hit) in hits.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.4}", hit.score)).set_alignment(CellAlignment::Right),
            Cell::new(&hit.text),
        ]);
    }
    table
}

fn info(settings: &Settings, json: bool) -> Result<()> {
    let persistence = IndexPersistence::new(&settings.index_path);
    // Reading the index does not need the model.
    let (vectors, _) = persistence.load()?;

    let info = IndexInfo {
        entries: vectors.len(),
        dimension: vectors.dimension().map(|d| d.get()),
        model: settings.embedding.model.clone(),
        vectors_path: persistence.vectors_path().to_path_buf(),
        texts_path: persistence.texts_path(),
        exists: persistence.exists(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Entries:    {}", info.entries);
        match info.dimension {
            Some(dimension) => println!("Dimension:  {dimension}"),
            None => println!("Dimension:  (not set)"),
        }
        println!("Model:      {}", info.model);
        println!("Vectors:    {}", info.vectors_path.display());
        println!("Texts:      {}", info.texts_path.display());
    }
    Ok(())
}
