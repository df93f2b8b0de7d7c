use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nflstats::{cli, db};

#[derive(Parser)]
#[command(name = "nflstats")]
#[command(about = "Aggregates play-by-play events into player and team game stats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a JSON bundle of games
    Aggregate {
        #[arg(short, long)]
        input: PathBuf,
        /// Directory to write player/team CSV exports into
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Upsert the rows into the database
        #[arg(long)]
        persist: bool,
    },
    /// Initialize the database
    InitDb,
    /// Show a player's stored game log
    Player {
        #[arg(short, long)]
        id: String,
    },
    /// Show a team's stored game log
    Team {
        #[arg(short, long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            input,
            csv,
            persist,
        } => {
            tracing::info!("Aggregating games from {}", input.display());
            cli::aggregate(&input, csv.as_deref(), persist).await?;
        }
        Commands::InitDb => {
            tracing::info!("Initializing database...");
            db::init_database().await?;
        }
        Commands::Player { id } => {
            tracing::info!("Querying player: {}", id);
            cli::query_player(&id).await?;
        }
        Commands::Team { id } => {
            tracing::info!("Querying team: {}", id);
            cli::query_team(&id).await?;
        }
    }

    Ok(())
}
