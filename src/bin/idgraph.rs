//! idgraph CLI: schema, ingest, lookup and cleanup against a SQLite store.
//!
//! Usage:
//!   idgraph [--db path] [--config file] schema
//!   idgraph ingest entities.json [--batch-size N]
//!   idgraph lookup lookups.json [--workers N | --direct]
//!   idgraph cleanup

use clap::{Parser, Subcommand};
use idgraph::{Entity, Lookup, OpenStore, ResolveApi, ResolverConfig, SqliteStore};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "idgraph",
    version,
    about = "Bitemporal identifier-to-entity resolution"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the entity constraint and lookup indexes
    Schema,
    /// Ingest entities from a JSON array
    Ingest {
        /// JSON file holding `[Entity]`
        file: PathBuf,
        /// Entities per write
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
    /// Resolve lookups from a JSON array and print the results as JSON
    Lookup {
        /// JSON file holding `[Lookup]`
        file: PathBuf,
        /// Concurrent workers (defaults to the configured worker count)
        #[arg(long, conflicts_with = "direct")]
        workers: Option<usize>,
        /// One lookup at a time, entity-held identifiers only
        #[arg(long)]
        direct: bool,
    },
    /// Drop the schema and delete every node
    Cleanup,
}

/// Get the default database path (~/.local/share/idgraph/idgraph.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("idgraph").join("idgraph.db")
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_api(db: Option<PathBuf>, config: Option<PathBuf>) -> Result<ResolveApi, String> {
    let config = match config {
        Some(path) => ResolverConfig::from_file(&path)
            .map_err(|e| format!("Failed to load config {}: {}", path.display(), e))?,
        None => ResolverConfig::default(),
    };
    let db_path = db.unwrap_or_else(default_db_path);
    let store = SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(ResolveApi::new(Arc::new(store), config))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

async fn cmd_schema(api: &ResolveApi) -> Result<(), String> {
    let created = api.ensure_schema().await.map_err(|e| e.to_string())?;
    println!("Schema ready ({} objects created)", created);
    Ok(())
}

async fn cmd_ingest(api: &ResolveApi, file: &Path, batch_size: usize) -> Result<(), String> {
    let entities: Vec<Entity> = read_json(file)?;
    let mut nodes = 0;
    for batch in entities.chunks(batch_size.max(1)) {
        let summary = api.create_entities(batch).await.map_err(|e| e.to_string())?;
        nodes += summary.nodes_created;
    }
    println!("Ingested {} entities ({} nodes)", entities.len(), nodes);
    Ok(())
}

async fn cmd_lookup(api: &ResolveApi, file: &Path, workers: Option<usize>, direct: bool) -> Result<(), String> {
    let lookups: Vec<Lookup> = read_json(file)?;
    let results = if direct {
        api.lookup_direct_entities(&lookups).await
    } else {
        let workers = workers.unwrap_or(api.config().default_workers);
        api.lookup_entities_concurrent(&lookups, workers).await
    }
    .map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&results).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn cmd_cleanup(api: &ResolveApi) -> Result<(), String> {
    let deleted = api.cleanup().await.map_err(|e| e.to_string())?;
    println!("Deleted {} nodes", deleted);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let api = match open_api(cli.db, cli.config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match cli.command {
        Commands::Schema => cmd_schema(&api).await,
        Commands::Ingest { file, batch_size } => cmd_ingest(&api, &file, batch_size).await,
        Commands::Lookup { file, workers, direct } => cmd_lookup(&api, &file, workers, direct).await,
        Commands::Cleanup => cmd_cleanup(&api).await,
    };
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
