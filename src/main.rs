use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use ripen::config::Config;
use ripen::{ProgressKey, ProgressStore, ReviewEvent, SqliteStore};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ripen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schedule flashcard reviews with SM-2")]
struct Cli {
    /// Config file (default: <config dir>/ripen/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// User to act as, overriding `default_user`
    #[arg(long, short, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a review and print the new schedule
    Review {
        item: String,
        /// hard, medium or easy (anything else counts as medium)
        rating: String,
    },
    /// List items due for review
    Due {
        /// RFC 3339 timestamp to evaluate against (default: now)
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
    /// Show new/learning/mastered counts and average ease
    Stats,
    /// Show the stored scheduling state of one item
    Show { item: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    config.ensure_dirs()?;
    let store = SqliteStore::open(&config.db_path, config.busy_timeout())
        .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?;
    let user = cli.user.unwrap_or_else(|| config.default_user.clone());

    match cli.command {
        Commands::Review { item, rating } => {
            let event = ReviewEvent::from_rating(&user, item, &rating, Utc::now());
            let outcome = ripen::submit_review(&store, &event)?;
            print_json(&outcome)
        }
        Commands::Due { as_of } => {
            let items = ripen::due_items(&store, &user, as_of.unwrap_or_else(Utc::now))?;
            print_json(&items)
        }
        Commands::Stats => print_json(&ripen::statistics(&store, &user)?),
        Commands::Show { item } => print_json(&store.get(&ProgressKey::new(&user, item))?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
