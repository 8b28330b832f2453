//! RivalScope — competitor dashboard snapshots from the command line.

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rivalscope_auth::{hash_password, Authenticator, StoreAuthenticator};
use rivalscope_core::RivalScopeConfig;
use rivalscope_insights::{
    load_dashboard, load_detail, load_listing, load_overview, QueryContext, SearchQuery,
};
use rivalscope_store::{DocumentStore, Filter, SqliteStore, StoreInfo};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod import;

#[derive(Parser)]
#[command(name = "rivalscope")]
#[command(about = "Competitor intelligence dashboard: overview, dashboard, listing and detail views")]
struct Cli {
    /// Data directory (defaults to RIVALSCOPE_DATA_DIR, then ../data next to the binary, then ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Totals, new this week, top categories, recent items and markets
    Overview,

    /// New entrants, market breakdown, top performers and recent activity
    Dashboard,

    /// Search the competitor listing
    Competitors {
        /// Free-text search over name, website, business model, category and market
        #[arg(short, long, default_value = "")]
        q: String,

        /// Market code (fi, no, dk, se, de, fr, it, es)
        #[arg(short, long, default_value = "")]
        market: String,
    },

    /// Show one competitor by identifier or slug
    Show {
        /// Record identifier or slug (market_name)
        id: String,
    },

    /// Database path, collections and store health
    DbInfo,

    /// Load a mongoexport JSON array or JSON Lines file
    Import {
        file: PathBuf,

        /// Target collection (defaults to COLLECTION_NAME)
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Check dashboard user credentials
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Produce a bcrypt hash for a new user's password
    HashPassword { password: String },
}

#[derive(Serialize)]
struct DbInfo {
    #[serde(flatten)]
    store: StoreInfo,
    collection: String,
    login_collection: Option<String>,
    documents: Option<u64>,
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    std::env::var("RIVALSCOPE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::HashPassword { password } = &cli.command {
        println!("{}", hash_password(password)?);
        return Ok(());
    }

    let data_dir = resolve_data_dir(cli.data_dir);
    info!("Data directory: {}", data_dir.display());

    let config = RivalScopeConfig::from_env(&data_dir)
        .with_context(|| format!("Failed to prepare data directory {}", data_dir.display()))?;
    let store = SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let ctx = QueryContext::new(&store, &config);

    match cli.command {
        Commands::Overview => print_json(&load_overview(&ctx, Utc::now()))?,
        Commands::Dashboard => print_json(&load_dashboard(&ctx, Utc::now()))?,
        Commands::Competitors { q, market } => {
            let query = SearchQuery::new(&q, &market, &config.markets);
            print_json(&load_listing(&ctx, &query))?;
        }
        Commands::Show { id } => match load_detail(&ctx, &id) {
            Some(detail) => print_json(&detail)?,
            None => bail!("Competitor not found: {}", id),
        },
        Commands::DbInfo => {
            let info = DbInfo {
                store: store.describe(),
                collection: config.collection.clone(),
                login_collection: config.login_collection.clone(),
                documents: ctx.collection.count(&Filter::All).ok(),
            };
            print_json(&info)?;
        }
        Commands::Import { file, collection } => {
            let target = collection.unwrap_or_else(|| config.collection.clone());
            let report = import::import_file(&store, &target, &file);
            import::print_report(&report);
            std::process::exit(if report.errors.is_empty() { 0 } else { 1 });
        }
        Commands::Login { email, password } => {
            let outcome = StoreAuthenticator::from_config(&store, &config).authenticate(&email, &password);
            print_json(&outcome)?;
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Commands::HashPassword { .. } => {}
    }

    Ok(())
}
