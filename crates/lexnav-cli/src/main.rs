//! `lexnav`: maintenance commands for the statute navigation store.
//!
//! # Usage
//!
//! ```text
//! lexnav validate            # check every statute's order indices
//! lexnav reindex 7 --dry-run --show-details
//! lexnav resolve income-tax-act section-2
//! ```

mod commands;
mod settings;

use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lexnav_cache::MemoryCache;
use lexnav_engine::Lexnav;
use lexnav_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lexnav", author, version, about = "Statute navigation maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "lexnav.toml", global = true)]
  config: PathBuf,

  /// SQLite database, overriding the configured one.
  #[arg(long, env = "LEXNAV_DATABASE", global = true)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Check order indices for gaps, duplicates and missing values.
  Validate {
    /// Only this statute; all statutes when omitted.
    statute_id: Option<i64>,
  },
  /// Renumber order indices in reading order.
  Reindex {
    /// Only this statute; all statutes when omitted.
    statute_id: Option<i64>,
    /// Compute the new indices without writing them.
    #[arg(long)]
    dry_run: bool,
    /// Print every index that changes.
    #[arg(long)]
    show_details: bool,
  },
  /// Resolve a slug and print it with its breadcrumb as JSON.
  Resolve {
    statute_slug: String,
    slug:         String,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  if let Some(database) = cli.database {
    settings.database = database;
  }

  let store = SqliteStore::open(&settings.database)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.database))?;
  let engine = Lexnav::new(store, MemoryCache::new(), settings.navigation)
    .context("invalid [navigation] configuration")?;

  let ok = match cli.command {
    Command::Validate { statute_id } => commands::validate(&engine, statute_id).await?,
    Command::Reindex { statute_id, dry_run, show_details } => {
      commands::reindex(&engine, statute_id, dry_run, show_details).await? == 0
    }
    Command::Resolve { statute_slug, slug } => {
      commands::resolve(&engine, &statute_slug, &slug).await?;
      true
    }
  };

  Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
