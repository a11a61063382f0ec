// clubrecord entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr; stdout carries the JSON output)
// 2. Load config
// 3. Pick the document store (JSON dump or REST)
// 4. Load the snapshot once and derive every table
// 5. Print the requested view

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use clubrecord_app::{load_view, View};
use clubrecord_core::config::{self, Config};
use clubrecord_core::model::Year;
use clubrecord_core::store::{DocumentStore, MemoryStore};
use clubrecord_firestore::FirestoreStore;

#[derive(Parser)]
#[command(name = "clubrecord")]
#[command(about = "Club leaderboards, player records and history from the match database", long_about = None)]
struct Cli {
    /// Directory holding config/ (and defaults/)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this year as the current season
    #[arg(long, global = true)]
    as_of: Option<Year>,

    /// Read a JSON dump instead of the hosted database
    #[arg(long, global = true)]
    dump: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-year, career and best-season leaderboards
    Records,
    /// Career and season standings of one player
    Search {
        /// Player name (case-insensitive)
        name: String,
    },
    /// Season history, podium badges and best partners of one player
    History {
        /// Player id (case-insensitive)
        player: String,
    },
    /// Primary position of every player in the match log
    Positions,
}

impl From<Commands> for View {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Records => View::Records,
            Commands::Search { name } => View::Search(name),
            Commands::History { player } => View::History(player),
            Commands::Positions => View::Positions,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;

    // 2. Load config
    let loaded = match &cli.config {
        Some(dir) => config::load_config_at(dir),
        None => config::load_config(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) if cli.dump.is_some() => {
            warn!(error = %e, "no usable config, using defaults for the dump");
            Config::default()
        }
        Err(e) => return Err(e).context("failed to load configuration"),
    };
    if let Some(as_of) = cli.as_of {
        config.seasons.as_of = Some(as_of);
    }
    let window = config.window();
    info!(years = ?window.years(), current = window.current(), "season window");

    // 3. Pick the store
    let store: Box<dyn DocumentStore> = match &cli.dump {
        Some(path) => {
            info!(path = %path.display(), "reading document dump");
            Box::new(
                MemoryStore::from_path(path)
                    .with_context(|| format!("failed to read dump {}", path.display()))?,
            )
        }
        None => Box::new(
            FirestoreStore::from_config(&config).context("failed to create document store client")?,
        ),
    };

    // 4. Load once, derive everything
    let view = load_view(store.as_ref(), &config, window).await;

    // 5. Print
    let output = view.render(&View::from(cli.command))?;
    println!("{output}");

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("clubrecord=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
