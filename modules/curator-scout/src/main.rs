use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use curator_cache::{CacheStore, MemoryCache, SqliteCache};
use curator_common::{CuratorConfig, CuratorError};
use curator_scout::notify::LogBackend;
use curator_scout::offline::{FixtureCatalog, HeuristicScorer, KeywordCriteriaExtractor};
use curator_scout::{Curator, WorkflowDeps};

#[derive(Debug, Parser)]
#[command(name = "curator", about = "Curate recommendations from a catalog")]
struct Cli {
    /// TOML config file. Defaults plus CURATOR_* env vars when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one request against a catalog fixture.
    Run {
        /// Free-text request, e.g. "space adventures for kids, no horror".
        request: String,

        /// JSON catalog fixture with `listing` and `pages` (see demos/catalog.json).
        #[arg(long)]
        catalog: PathBuf,

        /// Use a throwaway in-memory cache instead of the SQLite store.
        #[arg(long)]
        no_cache: bool,

        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show cache store statistics.
    CacheStats,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("curator=info"))?;
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => CuratorConfig::load(path)?,
        None => CuratorConfig::from_env()?,
    };
    config.log_summary();

    match cli.command {
        Command::Run {
            request,
            catalog,
            no_cache,
            json,
        } => run(config, &request, &catalog, no_cache, json).await,
        Command::CacheStats => {
            let cache = open_cache(&config).await?;
            let stats = cache.stats().await;
            println!("entries: {}", stats.count);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!("oldest:  {oldest}");
                println!("newest:  {newest}");
            }
            Ok(())
        }
    }
}

async fn open_cache(config: &CuratorConfig) -> Result<SqliteCache> {
    SqliteCache::connect(&config.cache.url)
        .await
        .map_err(|e| CuratorError::CacheUnavailable(format!("{e:#}")))
        .context("Cache store is required for a run; pass --no-cache to skip it")
}

async fn run(
    config: CuratorConfig,
    request: &str,
    catalog_path: &Path,
    no_cache: bool,
    json: bool,
) -> Result<()> {
    let catalog = FixtureCatalog::load(catalog_path)?;
    info!(pages = catalog.page_count(), "Catalog fixture loaded");

    let cache: Arc<dyn CacheStore> = if no_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(open_cache(&config).await?)
    };

    let deps = WorkflowDeps::builder()
        .catalog(Arc::new(catalog))
        .extractor(Arc::new(KeywordCriteriaExtractor))
        .scorer(Arc::new(HeuristicScorer))
        .cache(cache)
        .notifier(Arc::new(LogBackend))
        .config(config)
        .build();
    let curator = Curator::new(deps);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current stage");
            on_signal.cancel();
        }
    });

    let outcome = curator.run_with_cancel(request, cancel).await?;

    if json {
        let body = serde_json::json!({
            "run_id": outcome.run_id,
            "recommendations": outcome.recommendations(),
            "stats": outcome.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if outcome.recommendations().is_empty() {
        println!("No recommendations found for \"{request}\".");
    }
    for (rank, pick) in outcome.recommendations().iter().enumerate() {
        let year = pick.item.year.map(|y| format!(" ({y})")).unwrap_or_default();
        println!(
            "{}. {}{} [{:.2}] {}",
            rank + 1,
            pick.item.title,
            year,
            pick.confidence,
            pick.reasoning
        );
    }
    println!("{}", outcome.stats());
    Ok(())
}
