//! `leaguectl` - command-line front end for a league store.
//!
//! Every command opens the configured backend (SQLite when a database URL is
//! set and reachable, the JSON file store otherwise), runs one operation and
//! prints the result to stdout. Logs go to stderr, or to a daily rolling file
//! in `LEAGUE_LOG_DIR` when that is set.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use league::{LeagueBackend, Settings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod format;

const LOG_DIR_ENV: &str = "LEAGUE_LOG_DIR";

#[derive(Parser, Debug)]
#[command(name = "leaguectl", version, about = "Manage league teams, games and rankings")]
struct Cli {
    /// Directory of the JSON file store (overrides LEAGUE_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// SQLite database URL, e.g. sqlite://league.db (overrides DATABASE_URL).
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(dir) = &self.data_dir {
            settings = settings.with_data_dir(dir);
        }
        if let Some(url) = &self.database_url {
            settings = settings.with_database_url(url);
        }
        settings
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// List registered teams.
    Teams,
    /// Show one owner's team and record.
    Team {
        #[arg(long)]
        owner: String,
    },
    /// League standings by record, then point differential.
    Standings,
    /// Power rankings with head-to-head tie-breaks.
    Rankings,
    /// Recent game results, newest first.
    Games {
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
    /// League name, season, week and totals.
    Info,
    /// Show every config value.
    Config,
    /// Register a team for an owner.
    Register {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        /// Two or three letters, e.g. KC.
        #[arg(long)]
        abbr: String,
        /// Display name of the owner.
        #[arg(long)]
        label: Option<String>,
    },
    /// Remove a team by owner or by abbreviation.
    Remove {
        #[arg(long, conflicts_with = "abbr", required_unless_present = "abbr")]
        owner: Option<String>,
        #[arg(long)]
        abbr: Option<String>,
    },
    /// Move a team, its record and its history to another owner.
    Reassign {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Display name of the new owner.
        #[arg(long)]
        label: Option<String>,
    },
    /// Report a game between two owners. The higher score wins.
    Report {
        first: String,
        first_score: u32,
        second: String,
        second_score: u32,
        /// Defaults to the current league week.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        week: Option<u32>,
    },
    /// Report a game from one owner's side against an opponent abbreviation.
    ReportMine {
        #[arg(long)]
        owner: String,
        score: u32,
        opponent: String,
        opponent_score: u32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        week: Option<u32>,
    },
    /// Set a config value. `season` and `week` must be positive integers.
    SetConfig { key: String, value: String },
    /// Move the league to the next week.
    AdvanceWeek,
    /// Remove every team, standing, game and head-to-head record. Config is
    /// kept.
    Reset {
        /// Confirm the reset. Without it nothing is removed.
        #[arg(long)]
        yes: bool,
    },
    /// Report teams and standings that are out of step.
    Check,
    /// Copy the file store into a SQLite database.
    Migrate {
        /// Target database URL, e.g. sqlite://league.db
        #[arg(long)]
        to: String,
    },
}

/// Install the tracing subscriber. The returned guard must live until exit so
/// buffered file output is flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match std::env::var_os(LOG_DIR_ENV) {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "leaguectl");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();
    let settings = cli.settings();

    let output = match cli.command {
        Command::Migrate { to } => commands::migrate(&settings, &to).await?,
        command => {
            let backend = LeagueBackend::connect(&settings).await?;
            let result = commands::execute(&backend, command).await;
            backend.close().await;
            result?
        }
    };

    println!("{output}");
    Ok(())
}
