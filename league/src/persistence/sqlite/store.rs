//! [`LeagueStore`] over a SQLite pool.

use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::debug;

use super::{config_repo, game_repo, head_to_head_repo, standing_repo, team_repo};
use crate::model::{
    normalize_config_value, ConfigValue, GameResult, HeadToHead, LeagueConfig, NewTeam, OwnerKey,
    Standing, Team, ValidationError,
};
use crate::persistence::traits::LeagueStore;
use crate::persistence::PersistenceError;

/// SQLite implementation of [`LeagueStore`].
///
/// Game and head-to-head rows must reference registered teams; the foreign
/// keys reject anything else.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl LeagueStore for SqliteStore {
    async fn get_all_teams(&self) -> Result<BTreeMap<OwnerKey, Team>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        team_repo::fetch_all(&mut conn).await
    }

    async fn get_team(&self, owner: &OwnerKey) -> Result<Option<Team>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        team_repo::fetch_one(&mut conn, owner).await
    }

    async fn create_team(&self, team: &NewTeam) -> Result<Team, PersistenceError> {
        let team = team.clone().into_team()?;
        let mut tx = self.pool.begin().await?;

        if team_repo::fetch_one(&mut tx, &team.owner_id).await?.is_some() {
            return Err(ValidationError::OwnerTaken(team.owner_id).into());
        }
        if team_repo::abbreviation_in_use(&mut tx, &team.abbreviation).await? {
            return Err(ValidationError::AbbreviationTaken(team.abbreviation).into());
        }

        team_repo::insert(&mut tx, &team).await?;
        standing_repo::insert_zeroed(&mut tx, &team.owner_id).await?;
        tx.commit().await?;

        debug!(owner = %team.owner_id, abbreviation = %team.abbreviation, "Created team");
        Ok(team)
    }

    async fn delete_team(&self, owner: &OwnerKey) -> Result<bool, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = team_repo::delete(&mut conn, owner).await?;
        if deleted {
            debug!(owner = %owner, "Deleted team");
        }
        Ok(deleted)
    }

    async fn reassign_team(
        &self,
        from: &OwnerKey,
        to: &OwnerKey,
        owner_label: Option<&str>,
    ) -> Result<Team, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        if team_repo::fetch_one(&mut tx, from).await?.is_none() {
            return Err(PersistenceError::TeamNotFound(from.clone()));
        }
        if team_repo::fetch_one(&mut tx, to).await?.is_some() {
            return Err(ValidationError::OwnerTaken(to.clone()).into());
        }

        team_repo::rekey(&mut tx, from, to, owner_label).await?;
        let team = team_repo::fetch_one(&mut tx, to)
            .await?
            .ok_or_else(|| PersistenceError::TeamNotFound(to.clone()))?;
        tx.commit().await?;

        debug!(from = %from, to = %to, "Reassigned team");
        Ok(team)
    }

    async fn reset_league(&self) -> Result<usize, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let games = game_repo::delete_all(&mut tx).await?;
        let teams = team_repo::delete_all(&mut tx).await?;
        tx.commit().await?;

        debug!(teams, games, "Reset league");
        Ok(usize::try_from(teams).unwrap_or(usize::MAX))
    }

    async fn get_all_standings(&self) -> Result<BTreeMap<OwnerKey, Standing>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        standing_repo::fetch_all(&mut conn).await
    }

    async fn get_standing(&self, owner: &OwnerKey) -> Result<Option<Standing>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        standing_repo::fetch_one(&mut conn, owner).await
    }

    async fn update_standing(
        &self,
        owner: &OwnerKey,
        standing: &Standing,
    ) -> Result<(), PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        if !standing_repo::replace(&mut conn, owner, standing).await? {
            return Err(PersistenceError::StandingNotFound(owner.clone()));
        }
        Ok(())
    }

    async fn record_game(&self, game: &GameResult) -> Result<(), PersistenceError> {
        game.validate()?;
        let mut conn = self.pool.acquire().await?;
        game_repo::insert(&mut conn, game).await
    }

    async fn list_games(&self) -> Result<Vec<GameResult>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        game_repo::fetch_all(&mut conn).await
    }

    async fn recent_games(&self, limit: usize) -> Result<Vec<GameResult>, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        game_repo::fetch_recent(&mut conn, limit).await
    }

    async fn apply_game(&self, game: &GameResult) -> Result<(Standing, Standing), PersistenceError> {
        game.validate()?;
        let (winner, loser) = game.participants()?;
        let mut tx = self.pool.begin().await?;

        if !standing_repo::add_result(&mut tx, winner, true, game.winner_score, game.loser_score)
            .await?
        {
            return Err(PersistenceError::StandingNotFound(winner.clone()));
        }
        if !standing_repo::add_result(&mut tx, loser, false, game.loser_score, game.winner_score)
            .await?
        {
            return Err(PersistenceError::StandingNotFound(loser.clone()));
        }
        game_repo::insert(&mut tx, game).await?;
        head_to_head_repo::increment(&mut tx, winner, loser).await?;

        let winner_standing = standing_repo::fetch_one(&mut tx, winner)
            .await?
            .ok_or_else(|| PersistenceError::StandingNotFound(winner.clone()))?;
        let loser_standing = standing_repo::fetch_one(&mut tx, loser)
            .await?
            .ok_or_else(|| PersistenceError::StandingNotFound(loser.clone()))?;
        tx.commit().await?;

        Ok((winner_standing, loser_standing))
    }

    async fn record_head_to_head(
        &self,
        winner: &OwnerKey,
        loser: &OwnerKey,
    ) -> Result<(), PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        head_to_head_repo::increment(&mut conn, winner, loser).await
    }

    async fn get_all_head_to_head(&self) -> Result<HeadToHead, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        head_to_head_repo::fetch_all(&mut conn).await
    }

    async fn get_config(&self) -> Result<LeagueConfig, PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        config_repo::fetch_all(&mut conn).await
    }

    async fn set_config(&self, key: &str, value: ConfigValue) -> Result<(), PersistenceError> {
        let value = normalize_config_value(key, value)?;
        let mut conn = self.pool.acquire().await?;
        config_repo::upsert(&mut conn, key, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;

    fn owner(key: &str) -> OwnerKey {
        OwnerKey::from(key)
    }

    async fn test_store() -> SqliteStore {
        let db = Database::new_in_memory().await.unwrap();
        SqliteStore::new(db.pool().clone())
    }

    async fn seed(store: &SqliteStore) -> (Team, Team) {
        let kc = store
            .create_team(&NewTeam::new(owner("1"), "Chiefs", "KC"))
            .await
            .unwrap();
        let buf = store
            .create_team(&NewTeam::new(owner("2"), "Bills", "BUF"))
            .await
            .unwrap();
        (kc, buf)
    }

    #[tokio::test]
    async fn test_delete_keeps_games_without_owner_reference() {
        let store = test_store().await;
        let (kc, buf) = seed(&store).await;
        store
            .apply_game(&GameResult::between(1, &kc, &buf, 27, 20))
            .await
            .unwrap();

        assert!(store.delete_team(&owner("2")).await.unwrap());

        let games = store.list_games().await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].winner_id, Some(owner("1")));
        assert_eq!(games[0].loser_id, None);
        assert_eq!(games[0].loser_abbr, "BUF");
        assert!(store.get_all_head_to_head().await.unwrap().is_empty());
        assert!(store.get_standing(&owner("2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_game_rolls_back_when_loser_has_no_standing() {
        let store = test_store().await;
        let (kc, _) = seed(&store).await;
        let ghost = Team {
            name: "Ghosts".to_string(),
            abbreviation: "GHO".to_string(),
            owner_label: None,
            owner_id: owner("9"),
            created_at: 0,
        };

        let err = store
            .apply_game(&GameResult::between(1, &kc, &ghost, 10, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::StandingNotFound(ref o) if o == &owner("9")));

        assert_eq!(
            store.get_standing(&owner("1")).await.unwrap(),
            Some(Standing::default())
        );
        assert!(store.list_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reassign_cascades_to_games_and_head_to_head() {
        let store = test_store().await;
        let (kc, buf) = seed(&store).await;
        store
            .apply_game(&GameResult::between(1, &kc, &buf, 24, 21))
            .await
            .unwrap();

        let moved = store
            .reassign_team(&owner("1"), &owner("3"), Some("casey"))
            .await
            .unwrap();
        assert_eq!(moved.owner_id, owner("3"));
        assert_eq!(moved.owner_label.as_deref(), Some("casey"));

        let games = store.list_games().await.unwrap();
        assert_eq!(games[0].winner_id, Some(owner("3")));
        let h2h = store.get_all_head_to_head().await.unwrap();
        assert_eq!(h2h.wins(&owner("3"), &owner("2")), 1);
        assert_eq!(
            store.get_standing(&owner("3")).await.unwrap().map(|s| s.wins),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_game_referencing_unknown_owner_is_rejected() {
        let store = test_store().await;
        let (kc, _) = seed(&store).await;
        let mut game = GameResult::between(1, &kc, &kc, 7, 3);
        game.loser_id = Some(owner("404"));

        let err = store.record_game(&game).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Database(_)));
    }

    #[tokio::test]
    async fn test_config_round_trips_through_text_column() {
        let store = test_store().await;
        store
            .set_config("season", ConfigValue::Text(" 3 ".to_string()))
            .await
            .unwrap();
        store
            .set_config("motto", ConfigValue::Int(42))
            .await
            .unwrap();

        let config = store.get_config().await.unwrap();
        assert_eq!(config.season(), 3);
        assert_eq!(config.get("season"), Some(&ConfigValue::Int(3)));
        assert_eq!(config.get("motto"), Some(&ConfigValue::Text("42".to_string())));
    }
}
