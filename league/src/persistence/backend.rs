//! Startup backend selection.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

use super::sqlite::{Database, SqliteStore};
use super::traits::LeagueStore;
use super::{FileStore, IntegrityReport, PersistenceError};
use crate::model::{
    ConfigValue, GameResult, HeadToHead, LeagueConfig, NewTeam, OwnerKey, Standing, Team,
};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    File,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Sqlite => f.write_str("sqlite"),
            BackendKind::File => f.write_str("file"),
        }
    }
}

/// The store selected at startup. Call sites use it through [`LeagueStore`]
/// and never branch on the variant.
pub enum LeagueBackend {
    Sqlite(SqliteStore),
    File(FileStore),
}

impl LeagueBackend {
    /// Open the configured backend.
    ///
    /// With a database URL the relational store is tried first; if it cannot
    /// be opened a warning is logged and the file store in the data directory
    /// is used instead. Failing to open the file store is an error.
    pub async fn connect(settings: &Settings) -> Result<Self, PersistenceError> {
        if let Some(url) = settings.database_url() {
            match Database::connect(url).await {
                Ok(db) => {
                    info!(backend = %BackendKind::Sqlite, "Using database backend");
                    return Ok(Self::Sqlite(SqliteStore::new(db.pool().clone())));
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        data_dir = %settings.data_dir().display(),
                        "Database unavailable, falling back to file storage"
                    );
                }
            }
        }

        let store = FileStore::open(settings.data_dir()).await?;
        info!(
            backend = %BackendKind::File,
            data_dir = %settings.data_dir().display(),
            "Using file backend"
        );
        Ok(Self::File(store))
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Sqlite(_) => BackendKind::Sqlite,
            Self::File(_) => BackendKind::File,
        }
    }

    /// Teams, standings and head-to-head entries that are out of step. The
    /// database enforces the pairing with foreign keys and always reports
    /// clean.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, PersistenceError> {
        match self {
            Self::Sqlite(_) => Ok(IntegrityReport::default()),
            Self::File(store) => store.check_integrity().await,
        }
    }

    /// Release the connection pool, if any.
    pub async fn close(&self) {
        if let Self::Sqlite(store) = self {
            store.close().await;
        }
    }
}

impl LeagueStore for LeagueBackend {
    async fn get_all_teams(&self) -> Result<BTreeMap<OwnerKey, Team>, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.get_all_teams().await,
            Self::File(s) => s.get_all_teams().await,
        }
    }

    async fn get_team(&self, owner: &OwnerKey) -> Result<Option<Team>, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.get_team(owner).await,
            Self::File(s) => s.get_team(owner).await,
        }
    }

    async fn create_team(&self, team: &NewTeam) -> Result<Team, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.create_team(team).await,
            Self::File(s) => s.create_team(team).await,
        }
    }

    async fn delete_team(&self, owner: &OwnerKey) -> Result<bool, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.delete_team(owner).await,
            Self::File(s) => s.delete_team(owner).await,
        }
    }

    async fn reassign_team(
        &self,
        from: &OwnerKey,
        to: &OwnerKey,
        owner_label: Option<&str>,
    ) -> Result<Team, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.reassign_team(from, to, owner_label).await,
            Self::File(s) => s.reassign_team(from, to, owner_label).await,
        }
    }

    async fn reset_league(&self) -> Result<usize, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.reset_league().await,
            Self::File(s) => s.reset_league().await,
        }
    }

    async fn get_all_standings(&self) -> Result<BTreeMap<OwnerKey, Standing>, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.get_all_standings().await,
            Self::File(s) => s.get_all_standings().await,
        }
    }

    async fn get_standing(&self, owner: &OwnerKey) -> Result<Option<Standing>, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.get_standing(owner).await,
            Self::File(s) => s.get_standing(owner).await,
        }
    }

    async fn update_standing(
        &self,
        owner: &OwnerKey,
        standing: &Standing,
    ) -> Result<(), PersistenceError> {
        match self {
            Self::Sqlite(s) => s.update_standing(owner, standing).await,
            Self::File(s) => s.update_standing(owner, standing).await,
        }
    }

    async fn record_game(&self, game: &GameResult) -> Result<(), PersistenceError> {
        match self {
            Self::Sqlite(s) => s.record_game(game).await,
            Self::File(s) => s.record_game(game).await,
        }
    }

    async fn list_games(&self) -> Result<Vec<GameResult>, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.list_games().await,
            Self::File(s) => s.list_games().await,
        }
    }

    async fn recent_games(&self, limit: usize) -> Result<Vec<GameResult>, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.recent_games(limit).await,
            Self::File(s) => s.recent_games(limit).await,
        }
    }

    async fn apply_game(&self, game: &GameResult) -> Result<(Standing, Standing), PersistenceError> {
        match self {
            Self::Sqlite(s) => s.apply_game(game).await,
            Self::File(s) => s.apply_game(game).await,
        }
    }

    async fn record_head_to_head(
        &self,
        winner: &OwnerKey,
        loser: &OwnerKey,
    ) -> Result<(), PersistenceError> {
        match self {
            Self::Sqlite(s) => s.record_head_to_head(winner, loser).await,
            Self::File(s) => s.record_head_to_head(winner, loser).await,
        }
    }

    async fn get_all_head_to_head(&self) -> Result<HeadToHead, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.get_all_head_to_head().await,
            Self::File(s) => s.get_all_head_to_head().await,
        }
    }

    async fn get_config(&self) -> Result<LeagueConfig, PersistenceError> {
        match self {
            Self::Sqlite(s) => s.get_config().await,
            Self::File(s) => s.get_config().await,
        }
    }

    async fn set_config(&self, key: &str, value: ConfigValue) -> Result<(), PersistenceError> {
        match self {
            Self::Sqlite(s) => s.set_config(key, value).await,
            Self::File(s) => s.set_config(key, value).await,
        }
    }
}
