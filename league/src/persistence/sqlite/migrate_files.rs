//! One-shot copy of a file store into a SQLite store.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

use super::SqliteStore;
use crate::model::{NewTeam, OwnerKey, Team};
use crate::persistence::traits::LeagueStore;
use crate::persistence::{FileStore, PersistenceError};

/// Row counts for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub source: usize,
    pub target_before: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub target_after: usize,
}

/// Outcome of [`migrate_files_to_sqlite`]. Head-to-head counts are in
/// directional pairs; `head_to_head_wins` is the number of wins replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub config: EntityCounts,
    pub teams: EntityCounts,
    pub standings: EntityCounts,
    pub games: EntityCounts,
    pub head_to_head: EntityCounts,
    pub head_to_head_wins: u64,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "entity", "source", "before", "migrated", "skipped", "after"
        )?;
        let rows = [
            ("config", &self.config),
            ("teams", &self.teams),
            ("standings", &self.standings),
            ("games", &self.games),
            ("head_to_head", &self.head_to_head),
        ];
        for (name, c) in rows {
            writeln!(
                f,
                "{:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
                name, c.source, c.target_before, c.migrated, c.skipped, c.target_after
            )?;
        }
        write!(f, "head-to-head wins replayed: {}", self.head_to_head_wins)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Snapshot {
    config: usize,
    teams: usize,
    standings: usize,
    games: usize,
    head_to_head: usize,
}

async fn snapshot<S: LeagueStore>(store: &S) -> Result<Snapshot, PersistenceError> {
    Ok(Snapshot {
        config: store.get_config().await?.len(),
        teams: store.get_all_teams().await?.len(),
        standings: store.get_all_standings().await?.len(),
        games: store.list_games().await?.len(),
        head_to_head: store.get_all_head_to_head().await?.len(),
    })
}

/// Copy every collection of `source` into `target`.
///
/// Safe to re-run: teams already present in the target are skipped, standings
/// are overwritten with the source values, and games and head-to-head tallies
/// are only copied while the target has none. Entities that fail validation
/// or reference teams missing from the target are skipped with a warning.
/// The source files are only read.
pub async fn migrate_files_to_sqlite(
    source: &FileStore,
    target: &SqliteStore,
) -> Result<MigrationReport, PersistenceError> {
    info!(data_dir = %source.dir().display(), "Starting file to SQLite migration");
    let report = migrate_between(source, target).await?;
    info!(
        teams = report.teams.migrated,
        standings = report.standings.migrated,
        games = report.games.migrated,
        head_to_head = report.head_to_head.migrated,
        head_to_head_wins = report.head_to_head_wins,
        "File to SQLite migration completed"
    );
    Ok(report)
}

async fn migrate_between<S, T>(source: &S, target: &T) -> Result<MigrationReport, PersistenceError>
where
    S: LeagueStore,
    T: LeagueStore,
{
    let before = snapshot(target).await?;
    let mut report = MigrationReport {
        config: EntityCounts {
            target_before: before.config,
            ..Default::default()
        },
        teams: EntityCounts {
            target_before: before.teams,
            ..Default::default()
        },
        standings: EntityCounts {
            target_before: before.standings,
            ..Default::default()
        },
        games: EntityCounts {
            target_before: before.games,
            ..Default::default()
        },
        head_to_head: EntityCounts {
            target_before: before.head_to_head,
            ..Default::default()
        },
        head_to_head_wins: 0,
    };

    // Config
    let config = source.get_config().await?;
    report.config.source = config.len();
    for (key, value) in config.iter() {
        target.set_config(key, value.clone()).await?;
        report.config.migrated += 1;
    }

    // Teams
    let teams = source.get_all_teams().await?;
    report.teams.source = teams.len();
    let mut target_teams = target.get_all_teams().await?;
    for (owner, team) in &teams {
        if target_teams.contains_key(owner) {
            report.teams.skipped += 1;
            continue;
        }
        match target.create_team(&NewTeam::from(team)).await {
            Ok(created) => {
                target_teams.insert(owner.clone(), created);
                report.teams.migrated += 1;
            }
            Err(e) if e.is_validation() => {
                warn!(owner = %owner, error = %e, "Skipping team that failed validation");
                report.teams.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    // Standings
    let standings = source.get_all_standings().await?;
    report.standings.source = standings.len();
    for (owner, standing) in &standings {
        if !target_teams.contains_key(owner) {
            warn!(owner = %owner, "Skipping standing without a migrated team");
            report.standings.skipped += 1;
            continue;
        }
        target.update_standing(owner, standing).await?;
        report.standings.migrated += 1;
    }

    // Games
    let games = source.list_games().await?;
    report.games.source = games.len();
    if before.games > 0 {
        info!(existing = before.games, "Target already has games, skipping game history");
        report.games.skipped = games.len();
    } else {
        for game in &games {
            let mut game = game.clone();
            game.winner_id = known_owner(game.winner_id.take(), &target_teams);
            game.loser_id = known_owner(game.loser_id.take(), &target_teams);
            match target.record_game(&game).await {
                Ok(()) => report.games.migrated += 1,
                Err(e) if e.is_validation() => {
                    warn!(
                        winner = %game.winner_abbr,
                        loser = %game.loser_abbr,
                        error = %e,
                        "Skipping invalid game"
                    );
                    report.games.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // Head-to-head
    let head_to_head = source.get_all_head_to_head().await?;
    report.head_to_head.source = head_to_head.len();
    if before.head_to_head > 0 {
        info!(
            existing = before.head_to_head,
            "Target already has head-to-head records, skipping"
        );
        report.head_to_head.skipped = head_to_head.len();
    } else {
        for (winner, loser, wins) in head_to_head.iter() {
            if !target_teams.contains_key(winner) || !target_teams.contains_key(loser) {
                warn!(winner = %winner, loser = %loser, "Skipping head-to-head for unknown team");
                report.head_to_head.skipped += 1;
                continue;
            }
            for _ in 0..wins {
                target.record_head_to_head(winner, loser).await?;
            }
            report.head_to_head.migrated += 1;
            report.head_to_head_wins += u64::from(wins);
        }
    }

    let after = snapshot(target).await?;
    report.config.target_after = after.config;
    report.teams.target_after = after.teams;
    report.standings.target_after = after.standings;
    report.games.target_after = after.games;
    report.head_to_head.target_after = after.head_to_head;

    Ok(report)
}

fn known_owner(owner: Option<OwnerKey>, teams: &BTreeMap<OwnerKey, Team>) -> Option<OwnerKey> {
    owner.filter(|o| teams.contains_key(o))
}
