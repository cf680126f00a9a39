use std::path::PathBuf;

use tracing::{info, warn};

use league::persistence::sqlite::{migrate_files_to_sqlite, Database, SqliteStore};
use league::{
    compute_rankings, compute_standings, report_game, report_game_by_abbreviation, ConfigValue,
    FileStore, GameReport, LeagueBackend, LeagueStore, NewTeam, OwnerKey, PersistenceError,
    Settings,
};

use crate::format;
use crate::Command;

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] PersistenceError),

    #[error("owner {0} has no team")]
    NoTeam(OwnerKey),

    /// Migration reads an existing file store; it never creates one.
    #[error("no file store found at {0}")]
    MissingDataDir(PathBuf),
}

/// Run one command against the selected backend and return what to print.
pub async fn execute(backend: &LeagueBackend, command: Command) -> Result<String, CliError> {
    let output = match command {
        Command::Teams => format::teams(&backend.get_all_teams().await?),
        Command::Team { owner } => {
            let owner = OwnerKey::new(owner);
            let team = backend
                .get_team(&owner)
                .await?
                .ok_or_else(|| CliError::NoTeam(owner.clone()))?;
            let standing = backend.get_standing(&owner).await?;
            format::team(&team, standing.as_ref())
        }
        Command::Standings => {
            let teams = backend.get_all_teams().await?;
            let standings = backend.get_all_standings().await?;
            let config = backend.get_config().await?;
            format::table(
                "League Standings",
                &compute_standings(&teams, &standings),
                &config,
            )
        }
        Command::Rankings => {
            let teams = backend.get_all_teams().await?;
            let standings = backend.get_all_standings().await?;
            let head_to_head = backend.get_all_head_to_head().await?;
            let config = backend.get_config().await?;
            format::table(
                "Power Rankings",
                &compute_rankings(&teams, &standings, &head_to_head),
                &config,
            )
        }
        Command::Games { count } => format::games(&backend.recent_games(count).await?),
        Command::Info => format::summary(&backend.summary().await?),
        Command::Config => format::config(&backend.get_config().await?),
        Command::Register {
            owner,
            name,
            abbr,
            label,
        } => {
            let mut request = NewTeam::new(OwnerKey::new(owner), name, abbr);
            if let Some(label) = label {
                request = request.with_owner_label(label);
            }
            let team = backend.create_team(&request).await?;
            format!("Registered {} ({}) for {}", team.name, team.abbreviation, team.owner_id)
        }
        Command::Remove { owner, abbr } => match (owner, abbr) {
            (Some(owner), _) => {
                let owner = OwnerKey::new(owner);
                let team = backend.get_team(&owner).await?;
                match team {
                    Some(team) if backend.delete_team(&owner).await? => {
                        format!("Removed {} ({})", team.name, team.abbreviation)
                    }
                    _ => format!("Owner {owner} has no team; nothing removed"),
                }
            }
            (None, Some(abbr)) => {
                let team = backend.delete_team_by_abbreviation(&abbr).await?;
                format!("Removed {} ({})", team.name, team.abbreviation)
            }
            (None, None) => "Nothing to remove".to_string(),
        },
        Command::Reassign { from, to, label } => {
            let team = backend
                .reassign_team(&OwnerKey::new(from), &OwnerKey::new(to), label.as_deref())
                .await?;
            format!("{} ({}) now belongs to {}", team.name, team.abbreviation, team.owner_id)
        }
        Command::Report {
            first,
            first_score,
            second,
            second_score,
            week,
        } => {
            let report = GameReport {
                week,
                first: OwnerKey::new(first),
                first_score,
                second: OwnerKey::new(second),
                second_score,
            };
            format::outcome(&report_game(backend, &report).await?)
        }
        Command::ReportMine {
            owner,
            score,
            opponent,
            opponent_score,
            week,
        } => {
            let outcome = report_game_by_abbreviation(
                backend,
                &OwnerKey::new(owner),
                score,
                &opponent,
                opponent_score,
                week,
            )
            .await?;
            format::outcome(&outcome)
        }
        Command::SetConfig { key, value } => {
            backend.set_config(&key, ConfigValue::Text(value)).await?;
            let config = backend.get_config().await?;
            match config.get(&key) {
                Some(stored) => format!("{key} = {stored}"),
                None => format!("{key} cleared"),
            }
        }
        Command::AdvanceWeek => {
            let week = backend.advance_week().await?;
            format!("Advanced to week {week}")
        }
        Command::Reset { yes: false } => {
            "Reset removes every team, standing and game. Re-run with --yes to confirm."
                .to_string()
        }
        Command::Reset { yes: true } => {
            let teams = backend.reset_league().await?;
            warn!(backend = %backend.kind(), teams, "League reset");
            format!("League reset: {teams} teams removed, config kept")
        }
        Command::Check => format::integrity(&backend.check_integrity().await?),
        Command::Migrate { to } => {
            return Err(PersistenceError::Migration(format!(
                "migration to {to} must run without an open backend"
            ))
            .into())
        }
    };
    Ok(output)
}

/// Copy the file store in the configured data directory into the database at
/// `url`.
pub async fn migrate(settings: &Settings, url: &str) -> Result<String, CliError> {
    let data_dir = settings.data_dir();
    if !tokio::fs::try_exists(data_dir).await.unwrap_or(false) {
        return Err(CliError::MissingDataDir(data_dir.to_path_buf()));
    }

    let source = FileStore::open(data_dir).await?;
    let db = Database::connect(url).await?;
    info!(data_dir = %data_dir.display(), database = url, "Migrating file store");
    let target = SqliteStore::new(db.pool().clone());
    let report = migrate_files_to_sqlite(&source, &target).await;
    db.close().await;

    let report = report?;
    info!(teams = report.teams.migrated, games = report.games.migrated, "Migration finished");
    Ok(report.to_string())
}
