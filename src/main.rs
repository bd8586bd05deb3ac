//! CLI for the place recommender

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use place_recommender::geocoder::locate_all;
use place_recommender::persistence::index_file;
use place_recommender::server::{self, AppState};
use place_recommender::{
    logging, render, AppConfig, Geocoder, GoogleGeocoder, Index, OpenAiEmbedder, RecommendError,
    Recommender, SearchState,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "place-recommender")]
#[command(about = "Recommend places from review embeddings", long_about = None)]
struct Cli {
    /// Path to the persisted index (overrides INDEX_PATH)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Path to the review metadata CSV (overrides METADATA_PATH)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Log level (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend places for a free-text description
    Recommend {
        /// What kind of place you are looking for
        query: String,
        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,
        /// Write an HTML map of the results to this file
        #[arg(long)]
        map: Option<PathBuf>,
        /// Skip geocoding even if a maps key is configured
        #[arg(long)]
        no_geocode: bool,
    },
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides SERVER_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show index format and statistics without contacting any external service.
    ///
    /// The index may be a FAISS IndexFlatL2 file (as written by
    /// `faiss.write_index`) or a native file produced by `convert`.
    Inspect,
    /// Rewrite the index as a checksummed native file with a JSON manifest
    Convert {
        /// Destination path
        output: PathBuf,
    },
}

fn build_recommender(config: &AppConfig) -> Result<Recommender> {
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| RecommendError::configuration("OPENAI_API_KEY is not set"))?;
    let embedder = OpenAiEmbedder::new(api_key)?
        .with_base_url(config.openai_base_url.clone())
        .with_model(config.embedding_model.clone())
        .with_dimension(config.embedding_dimension);
    embedder.log_configuration();

    let state = SearchState::init(&config.state_paths(), config.embedding_dimension)
        .context("failed to load search state")?;
    Ok(Recommender::new(state, Arc::new(embedder))?)
}

fn build_geocoder(config: &AppConfig) -> Result<Option<Arc<dyn Geocoder>>> {
    match &config.google_maps_api_key {
        Some(key) => {
            let geocoder = GoogleGeocoder::new(key.clone(), config.http_timeout())?
                .with_base_url(config.geocode_base_url.clone())
                .with_retry(config.geocode_retry());
            Ok(Some(Arc::new(geocoder)))
        }
        None => {
            warn!("GOOGLE_MAPS_API_KEY is not set; results will not be geocoded");
            Ok(None)
        }
    }
}

async fn run_recommend(
    config: &AppConfig,
    query: &str,
    k: Option<usize>,
    map: Option<PathBuf>,
    no_geocode: bool,
) -> Result<()> {
    let recommender = build_recommender(config)?;
    let results = recommender
        .recommend(query, k.unwrap_or(config.top_k))
        .await?;

    if results.is_empty() {
        println!("No matching places found");
        return Ok(());
    }

    println!("Top {} results:", results.len());
    print!("{}", render::render_table(&results));

    let Some(map_path) = map else {
        return Ok(());
    };
    if no_geocode {
        warn!("--map ignored because geocoding is disabled");
        return Ok(());
    }
    let (Some(geocoder), Some(key)) = (build_geocoder(config)?, config.google_maps_api_key.as_deref())
    else {
        return Ok(());
    };

    let locations = locate_all(geocoder.as_ref(), &results).await;
    match render::render_map(&locations, key)? {
        Some(html) => {
            std::fs::write(&map_path, html)
                .with_context(|| format!("failed to write {}", map_path.display()))?;
            println!(
                "Map with {} of {} places written to {}",
                locations.len(),
                results.len(),
                map_path.display()
            );
        }
        None => println!("Could not locate any of the recommended places."),
    }
    Ok(())
}

fn run_inspect(config: &AppConfig) -> Result<()> {
    let (index, format) = index_file::load_with_format(&config.index_path)?;
    println!("Index: {}", config.index_path.display());
    println!("  format: {}", format);
    println!("  rows: {}", index.len());
    println!("  dimension: {}", index.dimension());
    match index_file::read_manifest(&config.index_path)? {
        Some(manifest) => println!(
            "  manifest: {} vectors, dimension {}, format v{}",
            manifest.vector_count, manifest.dimension, manifest.format_version
        ),
        None => println!("  manifest: none"),
    }
    Ok(())
}

fn run_convert(config: &AppConfig, output: &Path) -> Result<()> {
    let index = index_file::load(&config.index_path)?;
    index_file::save(output, &index)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Wrote {} vectors of dimension {} to {}",
        index.len(),
        index.dimension(),
        output.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(index) = cli.index {
        config.index_path = index;
    }
    if let Some(metadata) = cli.metadata {
        config.metadata_path = metadata;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.validate()?;
    logging::init(&config.log_level);
    debug!(config = %serde_json::to_string(&config)?, "effective configuration");

    match cli.command {
        Commands::Recommend {
            query,
            k,
            map,
            no_geocode,
        } => run_recommend(&config, &query, k, map, no_geocode).await?,
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server_addr.clone());
            let recommender = build_recommender(&config)?;
            let geocoder = build_geocoder(&config)?;
            info!(geocoding = geocoder.is_some(), "starting server");
            let state = AppState::new(
                recommender,
                geocoder,
                config.google_maps_api_key.clone(),
                config.top_k,
            );
            server::start(&addr, state).await?;
        }
        Commands::Inspect => run_inspect(&config)?,
        Commands::Convert { output } => run_convert(&config, &output)?,
    }
    Ok(())
}
