//! Flat-file league store.
//!
//! Each collection lives in its own JSON document under the data directory:
//!
//! | File | Shape |
//! |------|-------|
//! | `teams.json` | owner key → team |
//! | `standings.json` | owner key → standing |
//! | `games.json` | array of games, oldest first |
//! | `head_to_head.json` | `"<winner>_<loser>"` → `{ "wins": n }` |
//! | `config.json` | flat key → value, defaults pre-populated |
//!
//! Every mutation reads the whole document, edits it in memory and rewrites
//! it. There is no transaction spanning documents: operations that touch
//! several collections write them one after another, and a crash in between
//! leaves them out of step. [`FileStore::check_integrity`] reports such gaps;
//! nothing repairs them automatically. Concurrent writers are not serialised
//! either, so two overlapping read-modify-write cycles on the same document
//! lose one of the updates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::json_document::JsonDocument;
use super::traits::LeagueStore;
use super::PersistenceError;
use crate::model::{
    matchup_key, parse_matchup_key, ConfigValue, GameResult, HeadToHead, LeagueConfig, NewTeam,
    OwnerKey, Standing, Team, ValidationError,
};

type TeamsDoc = BTreeMap<OwnerKey, Team>;
type StandingsDoc = BTreeMap<OwnerKey, Standing>;
type GamesDoc = Vec<GameResult>;
type HeadToHeadDoc = BTreeMap<String, HeadToHeadEntry>;
type ConfigDoc = BTreeMap<String, ConfigValue>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct HeadToHeadEntry {
    wins: u32,
}

/// Teams and standings that are out of step with each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub teams_without_standing: Vec<OwnerKey>,
    pub standings_without_team: Vec<OwnerKey>,
    pub head_to_head_without_team: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.teams_without_standing.is_empty()
            && self.standings_without_team.is_empty()
            && self.head_to_head_without_team.is_empty()
    }
}

/// League store backed by JSON documents in a directory.
pub struct FileStore {
    dir: PathBuf,
    teams: JsonDocument<TeamsDoc>,
    standings: JsonDocument<StandingsDoc>,
    games: JsonDocument<GamesDoc>,
    head_to_head: JsonDocument<HeadToHeadDoc>,
    config: JsonDocument<ConfigDoc>,
}

impl FileStore {
    /// Open the store in `dir`, creating any missing documents, and log a
    /// warning if teams and standings are out of step.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let store = Self::new_in(dir.into());
        tokio::fs::create_dir_all(&store.dir).await?;

        let mut created = Vec::new();
        if store.teams.init_if_missing(&TeamsDoc::new()).await? {
            created.push("teams");
        }
        if store.standings.init_if_missing(&StandingsDoc::new()).await? {
            created.push("standings");
        }
        if store.games.init_if_missing(&GamesDoc::new()).await? {
            created.push("games");
        }
        if store.head_to_head.init_if_missing(&HeadToHeadDoc::new()).await? {
            created.push("head_to_head");
        }
        let defaults: ConfigDoc = LeagueConfig::default()
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if store.config.init_if_missing(&defaults).await? {
            created.push("config");
        }
        if !created.is_empty() {
            info!(dir = %store.dir.display(), ?created, "Initialised league data files");
        }

        let report = store.check_integrity().await?;
        if !report.is_clean() {
            warn!(
                teams_without_standing = ?report.teams_without_standing,
                standings_without_team = ?report.standings_without_team,
                head_to_head_without_team = ?report.head_to_head_without_team,
                "League data files are inconsistent and need manual reconciliation"
            );
        }
        Ok(store)
    }

    fn new_in(dir: PathBuf) -> Self {
        Self {
            teams: JsonDocument::new(dir.join("teams.json")),
            standings: JsonDocument::new(dir.join("standings.json")),
            games: JsonDocument::new(dir.join("games.json")),
            head_to_head: JsonDocument::new(dir.join("head_to_head.json")),
            config: JsonDocument::new(dir.join("config.json")),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Compare the teams, standings and head-to-head documents.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, PersistenceError> {
        let teams = self.teams.load().await?;
        let standings = self.standings.load().await?;
        let head_to_head = self.head_to_head.load().await?;

        let teams_without_standing = teams
            .keys()
            .filter(|owner| !standings.contains_key(*owner))
            .cloned()
            .collect();
        let standings_without_team = standings
            .keys()
            .filter(|owner| !teams.contains_key(*owner))
            .cloned()
            .collect();
        let head_to_head_without_team = head_to_head
            .keys()
            .filter(|key| match parse_matchup_key(key) {
                Some((winner, loser)) => !teams.contains_key(&winner) || !teams.contains_key(&loser),
                None => true,
            })
            .cloned()
            .collect();

        Ok(IntegrityReport {
            teams_without_standing,
            standings_without_team,
            head_to_head_without_team,
        })
    }

    async fn load_teams(&self) -> Result<TeamsDoc, PersistenceError> {
        let mut teams = self.teams.load().await?;
        for (owner, team) in teams.iter_mut() {
            if &team.owner_id != owner {
                team.owner_id = owner.clone();
            }
        }
        Ok(teams)
    }

    async fn load_head_to_head(&self) -> Result<HeadToHead, PersistenceError> {
        let doc = self.head_to_head.load().await?;
        let mut h2h = HeadToHead::new();
        for (key, entry) in doc {
            match parse_matchup_key(&key) {
                Some((winner, loser)) => h2h.insert(winner, loser, entry.wins),
                None => warn!(key = %key, "Ignoring unreadable head-to-head key"),
            }
        }
        Ok(h2h)
    }

    /// Rewrite the head-to-head document. Unreadable keys already in the file
    /// are kept as they are.
    async fn save_head_to_head(&self, h2h: &HeadToHead) -> Result<(), PersistenceError> {
        let mut doc: HeadToHeadDoc = self
            .head_to_head
            .load()
            .await?
            .into_iter()
            .filter(|(key, _)| parse_matchup_key(key).is_none())
            .collect();
        for (winner, loser, wins) in h2h.iter() {
            doc.insert(matchup_key(winner, loser), HeadToHeadEntry { wins });
        }
        self.head_to_head.save(&doc).await
    }
}

impl LeagueStore for FileStore {
    async fn get_all_teams(&self) -> Result<BTreeMap<OwnerKey, Team>, PersistenceError> {
        self.load_teams().await
    }

    async fn get_team(&self, owner: &OwnerKey) -> Result<Option<Team>, PersistenceError> {
        Ok(self.load_teams().await?.remove(owner))
    }

    async fn create_team(&self, team: &NewTeam) -> Result<Team, PersistenceError> {
        let team = team.clone().into_team()?;
        let mut teams = self.load_teams().await?;

        if teams.contains_key(&team.owner_id) {
            return Err(ValidationError::OwnerTaken(team.owner_id).into());
        }
        if teams
            .values()
            .any(|t| t.abbreviation.eq_ignore_ascii_case(&team.abbreviation))
        {
            return Err(ValidationError::AbbreviationTaken(team.abbreviation).into());
        }

        // Team first, then its standing.
        teams.insert(team.owner_id.clone(), team.clone());
        self.teams.save(&teams).await?;

        let mut standings = self.standings.load().await?;
        standings.insert(team.owner_id.clone(), Standing::default());
        self.standings.save(&standings).await?;

        debug!(owner = %team.owner_id, abbreviation = %team.abbreviation, "Created team");
        Ok(team)
    }

    async fn delete_team(&self, owner: &OwnerKey) -> Result<bool, PersistenceError> {
        let mut teams = self.load_teams().await?;
        if !teams.contains_key(owner) {
            return Ok(false);
        }

        // Dependents first so that a retry after a crash still finds the team.
        let mut standings = self.standings.load().await?;
        if standings.remove(owner).is_some() {
            self.standings.save(&standings).await?;
        }

        let mut h2h = self.load_head_to_head().await?;
        if h2h.remove_owner(owner) {
            self.save_head_to_head(&h2h).await?;
        }

        let mut games = self.games.load().await?;
        let mut games_changed = false;
        for game in games.iter_mut() {
            if game.winner_id.as_ref() == Some(owner) {
                game.winner_id = None;
                games_changed = true;
            }
            if game.loser_id.as_ref() == Some(owner) {
                game.loser_id = None;
                games_changed = true;
            }
        }
        if games_changed {
            self.games.save(&games).await?;
        }

        teams.remove(owner);
        self.teams.save(&teams).await?;

        debug!(owner = %owner, "Deleted team");
        Ok(true)
    }

    async fn reassign_team(
        &self,
        from: &OwnerKey,
        to: &OwnerKey,
        owner_label: Option<&str>,
    ) -> Result<Team, PersistenceError> {
        let mut teams = self.load_teams().await?;
        if !teams.contains_key(from) {
            return Err(PersistenceError::TeamNotFound(from.clone()));
        }
        if teams.contains_key(to) {
            return Err(ValidationError::OwnerTaken(to.clone()).into());
        }

        let mut standings = self.standings.load().await?;
        if let Some(standing) = standings.remove(from) {
            standings.insert(to.clone(), standing);
            self.standings.save(&standings).await?;
        }

        let mut h2h = self.load_head_to_head().await?;
        if h2h.rekey_owner(from, to) {
            self.save_head_to_head(&h2h).await?;
        }

        let mut games = self.games.load().await?;
        let mut games_changed = false;
        for game in games.iter_mut() {
            if game.winner_id.as_ref() == Some(from) {
                game.winner_id = Some(to.clone());
                games_changed = true;
            }
            if game.loser_id.as_ref() == Some(from) {
                game.loser_id = Some(to.clone());
                games_changed = true;
            }
        }
        if games_changed {
            self.games.save(&games).await?;
        }

        let mut team = teams
            .remove(from)
            .ok_or_else(|| PersistenceError::TeamNotFound(from.clone()))?;
        team.owner_id = to.clone();
        team.owner_label = owner_label.map(str::to_string);
        teams.insert(to.clone(), team.clone());
        self.teams.save(&teams).await?;

        debug!(from = %from, to = %to, "Reassigned team");
        Ok(team)
    }

    async fn reset_league(&self) -> Result<usize, PersistenceError> {
        let teams = self.teams.load().await?;

        // Same order as delete_team: dependents first, teams last.
        self.standings.save(&StandingsDoc::new()).await?;
        self.head_to_head.save(&HeadToHeadDoc::new()).await?;
        self.games.save(&GamesDoc::new()).await?;
        self.teams.save(&TeamsDoc::new()).await?;

        debug!(teams = teams.len(), "Reset league");
        Ok(teams.len())
    }

    async fn get_all_standings(&self) -> Result<BTreeMap<OwnerKey, Standing>, PersistenceError> {
        self.standings.load().await
    }

    async fn get_standing(&self, owner: &OwnerKey) -> Result<Option<Standing>, PersistenceError> {
        Ok(self.standings.load().await?.remove(owner))
    }

    async fn update_standing(
        &self,
        owner: &OwnerKey,
        standing: &Standing,
    ) -> Result<(), PersistenceError> {
        let mut standings = self.standings.load().await?;
        match standings.get_mut(owner) {
            Some(current) => *current = *standing,
            None => return Err(PersistenceError::StandingNotFound(owner.clone())),
        }
        self.standings.save(&standings).await
    }

    async fn record_game(&self, game: &GameResult) -> Result<(), PersistenceError> {
        game.validate()?;
        let mut games = self.games.load().await?;
        games.push(game.clone());
        self.games.save(&games).await
    }

    async fn list_games(&self) -> Result<Vec<GameResult>, PersistenceError> {
        self.games.load().await
    }

    async fn recent_games(&self, limit: usize) -> Result<Vec<GameResult>, PersistenceError> {
        let games = self.games.load().await?;
        Ok(games.into_iter().rev().take(limit).collect())
    }

    async fn apply_game(&self, game: &GameResult) -> Result<(Standing, Standing), PersistenceError> {
        game.validate()?;
        let (winner, loser) = game.participants()?;

        let mut standings = self.standings.load().await?;
        let winner_standing = standings
            .get(winner)
            .ok_or_else(|| PersistenceError::StandingNotFound(winner.clone()))?
            .with_win(game.winner_score, game.loser_score);
        let loser_standing = standings
            .get(loser)
            .ok_or_else(|| PersistenceError::StandingNotFound(loser.clone()))?
            .with_loss(game.loser_score, game.winner_score);
        standings.insert(winner.clone(), winner_standing);
        standings.insert(loser.clone(), loser_standing);
        self.standings.save(&standings).await?;

        let mut games = self.games.load().await?;
        games.push(game.clone());
        self.games.save(&games).await?;

        self.record_head_to_head(winner, loser).await?;

        Ok((winner_standing, loser_standing))
    }

    async fn record_head_to_head(
        &self,
        winner: &OwnerKey,
        loser: &OwnerKey,
    ) -> Result<(), PersistenceError> {
        let mut doc = self.head_to_head.load().await?;
        doc.entry(matchup_key(winner, loser)).or_default().wins += 1;
        self.head_to_head.save(&doc).await
    }

    async fn get_all_head_to_head(&self) -> Result<HeadToHead, PersistenceError> {
        self.load_head_to_head().await
    }

    async fn get_config(&self) -> Result<LeagueConfig, PersistenceError> {
        Ok(LeagueConfig::from_values(self.config.load().await?))
    }

    async fn set_config(&self, key: &str, value: ConfigValue) -> Result<(), PersistenceError> {
        let mut config = self.get_config().await?;
        config.set(key, value)?;
        let mut doc = self.config.load().await?;
        if let Some(value) = config.get(key) {
            doc.insert(key.to_string(), value.clone());
        }
        self.config.save(&doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(key: &str) -> OwnerKey {
        OwnerKey::from(key)
    }

    async fn open_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("data")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_open_creates_documents_with_default_config() {
        let (dir, _store) = open_store().await;
        let data = dir.path().join("data");
        for name in ["teams", "standings", "games", "head_to_head", "config"] {
            assert!(data.join(format!("{name}.json")).exists(), "{name} missing");
        }
        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(data.join("config.json")).unwrap())
                .unwrap();
        assert_eq!(config["season"], 1);
        assert_eq!(config["week"], 1);
        assert_eq!(config["league_name"], "Madden Franchise League");
        assert_eq!(config["admin_role"], "League Admin");
    }

    #[tokio::test]
    async fn test_head_to_head_layout_uses_pair_keys() {
        let (dir, store) = open_store().await;
        store.record_head_to_head(&owner("1"), &owner("2")).await.unwrap();
        store.record_head_to_head(&owner("1"), &owner("2")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("data").join("head_to_head.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["1_2"]["wins"], 2);
    }

    #[tokio::test]
    async fn test_unreadable_head_to_head_keys_are_ignored_and_kept() {
        let (dir, store) = open_store().await;
        let path = dir.path().join("data").join("head_to_head.json");
        std::fs::write(&path, r#"{"a_b_c": {"wins": 1}, "x_y": {"wins": 2}}"#).unwrap();

        let h2h = store.get_all_head_to_head().await.unwrap();
        assert_eq!(h2h.len(), 1);
        assert_eq!(h2h.wins(&owner("x"), &owner("y")), 2);

        store
            .create_team(&NewTeam::new(owner("x"), "Xs", "XX"))
            .await
            .unwrap();
        store.delete_team(&owner("x")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["a_b_c"]["wins"], 1);
        assert!(json.get("x_y").is_none());
    }

    #[tokio::test]
    async fn test_integrity_report_flags_half_written_pairs() {
        let (dir, store) = open_store().await;
        store
            .create_team(&NewTeam::new(owner("1"), "Chiefs", "KC"))
            .await
            .unwrap();
        assert!(store.check_integrity().await.unwrap().is_clean());

        // Simulate a crash between the team write and the standing write.
        std::fs::write(dir.path().join("data").join("standings.json"), "{}").unwrap();
        let report = store.check_integrity().await.unwrap();
        assert_eq!(report.teams_without_standing, vec![owner("1")]);
        assert!(report.standings_without_team.is_empty());
    }

    #[tokio::test]
    async fn test_team_map_key_wins_over_embedded_owner_id() {
        let (dir, store) = open_store().await;
        std::fs::write(
            dir.path().join("data").join("teams.json"),
            r#"{"7": {"name": "Bears", "abbreviation": "CHI", "owner": "sam", "owner_id": "8"}}"#,
        )
        .unwrap();
        let team = store.get_team(&owner("7")).await.unwrap().unwrap();
        assert_eq!(team.owner_id, owner("7"));
        assert_eq!(team.owner_label.as_deref(), Some("sam"));
        assert_eq!(team.created_at, 0);
    }

    #[tokio::test]
    async fn test_reopening_keeps_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store
                .create_team(&NewTeam::new(owner("1"), "Chiefs", "KC"))
                .await
                .unwrap();
            store.set_config("week", ConfigValue::Int(4)).await.unwrap();
        }
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.get_team(&owner("1")).await.unwrap().is_some());
        assert_eq!(store.get_config().await.unwrap().week(), 4);
    }

    #[tokio::test]
    async fn test_games_with_iso_dates_are_readable() {
        let (dir, store) = open_store().await;
        std::fs::write(
            dir.path().join("data").join("games.json"),
            r#"[{"week": 1, "winner_id": "1", "loser_id": "2", "winner_team": "Chiefs",
                "winner_abbr": "KC", "loser_team": "Bills", "loser_abbr": "BUF",
                "winner_score": 24, "loser_score": 17, "date": "2024-09-08T20:15:00.123456"}]"#,
        )
        .unwrap();

        let games = store.list_games().await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].played_at, 1725826500);
        assert_eq!(store.recent_games(5).await.unwrap(), games);
        assert_eq!(store.summary().await.unwrap().games_played, 1);

        // Rewrites store the date as seconds.
        store.record_game(&games[0]).await.unwrap();
        let raw = std::fs::read_to_string(dir.path().join("data").join("games.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["date"], 1725826500);
    }
}
