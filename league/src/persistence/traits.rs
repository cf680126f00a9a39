//! The league store contract.
//!
//! Both backends implement [`LeagueStore`] and are used interchangeably via
//! static dispatch. Methods return `impl Future + Send` rather than using
//! `async fn` so that the futures are guaranteed `Send` and can be driven from
//! `tokio::spawn`.
//!
//! Every method is a potential suspension point. Nothing here is cancellable:
//! a caller that drops an in-flight write must not assume it did not happen.

use std::collections::BTreeMap;
use std::future::Future;

use super::PersistenceError;
use crate::model::{
    normalize_abbreviation, ConfigValue, GameResult, HeadToHead, LeagueConfig, NewTeam, OwnerKey,
    Standing, Team, WEEK_KEY,
};

/// Counts for the league overview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueSummary {
    pub league_name: String,
    pub season: u32,
    pub week: u32,
    pub teams: usize,
    pub games_played: usize,
}

pub trait LeagueStore: Send + Sync {
    // ── Teams ──────────────────────────────────────────────────────────

    fn get_all_teams(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<OwnerKey, Team>, PersistenceError>> + Send;

    fn get_team(
        &self,
        owner: &OwnerKey,
    ) -> impl Future<Output = Result<Option<Team>, PersistenceError>> + Send;

    /// Register a team together with its zeroed standing.
    ///
    /// Fails with `OwnerTaken` if the owner already has a team and with
    /// `AbbreviationTaken` if the abbreviation matches an existing one,
    /// ignoring case. A team never exists without its standing on success.
    fn create_team(
        &self,
        team: &NewTeam,
    ) -> impl Future<Output = Result<Team, PersistenceError>> + Send;

    /// Remove a team and its standing and head-to-head tallies. Games keep
    /// their denormalized names but lose the owner reference.
    ///
    /// Returns `false` when the owner had no team.
    fn delete_team(
        &self,
        owner: &OwnerKey,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    /// Move a team, its standing and its head-to-head tallies from `from` to
    /// `to`. `owner_label` replaces the display label of the previous owner.
    fn reassign_team(
        &self,
        from: &OwnerKey,
        to: &OwnerKey,
        owner_label: Option<&str>,
    ) -> impl Future<Output = Result<Team, PersistenceError>> + Send;

    /// Remove every team, standing, game and head-to-head tally. Config is
    /// kept. Returns the number of teams removed.
    fn reset_league(&self) -> impl Future<Output = Result<usize, PersistenceError>> + Send;

    // ── Standings ──────────────────────────────────────────────────────

    fn get_all_standings(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<OwnerKey, Standing>, PersistenceError>> + Send;

    fn get_standing(
        &self,
        owner: &OwnerKey,
    ) -> impl Future<Output = Result<Option<Standing>, PersistenceError>> + Send;

    /// Replace a standing with final values (not deltas).
    fn update_standing(
        &self,
        owner: &OwnerKey,
        standing: &Standing,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    // ── Games ──────────────────────────────────────────────────────────

    /// Append a game record. Standings are not touched.
    fn record_game(
        &self,
        game: &GameResult,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// All games in the order they were recorded.
    fn list_games(&self) -> impl Future<Output = Result<Vec<GameResult>, PersistenceError>> + Send;

    /// The most recent `limit` games, newest first.
    fn recent_games(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<GameResult>, PersistenceError>> + Send;

    /// Apply a reported game: bump both standings, append the game and count
    /// the head-to-head win. Returns the winner's and loser's new standings.
    ///
    /// The SQLite backend runs this as one transaction. The file backend
    /// rewrites standings, games and head-to-head in that order.
    fn apply_game(
        &self,
        game: &GameResult,
    ) -> impl Future<Output = Result<(Standing, Standing), PersistenceError>> + Send;

    // ── Head-to-head ───────────────────────────────────────────────────

    /// Count one win of `winner` over `loser`, creating the pair if needed.
    fn record_head_to_head(
        &self,
        winner: &OwnerKey,
        loser: &OwnerKey,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn get_all_head_to_head(
        &self,
    ) -> impl Future<Output = Result<HeadToHead, PersistenceError>> + Send;

    // ── Config ─────────────────────────────────────────────────────────

    /// League settings, with defaults for keys that were never set.
    fn get_config(&self) -> impl Future<Output = Result<LeagueConfig, PersistenceError>> + Send;

    fn set_config(
        &self,
        key: &str,
        value: ConfigValue,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    // ── Provided ───────────────────────────────────────────────────────

    fn find_team_by_abbreviation(
        &self,
        abbreviation: &str,
    ) -> impl Future<Output = Result<Option<Team>, PersistenceError>> + Send {
        async move {
            let wanted = abbreviation.trim().to_ascii_uppercase();
            let teams = self.get_all_teams().await?;
            Ok(teams
                .into_values()
                .find(|team| team.abbreviation.eq_ignore_ascii_case(&wanted)))
        }
    }

    /// Remove the team holding `abbreviation`. Returns the removed team.
    fn delete_team_by_abbreviation(
        &self,
        abbreviation: &str,
    ) -> impl Future<Output = Result<Team, PersistenceError>> + Send {
        async move {
            let team = self
                .find_team_by_abbreviation(abbreviation)
                .await?
                .ok_or_else(|| {
                    PersistenceError::AbbreviationNotFound(
                        normalize_abbreviation(abbreviation)
                            .unwrap_or_else(|_| abbreviation.to_string()),
                    )
                })?;
            self.delete_team(&team.owner_id).await?;
            Ok(team)
        }
    }

    /// Move the league to the next week. Returns the new week.
    fn advance_week(&self) -> impl Future<Output = Result<u32, PersistenceError>> + Send {
        async move {
            let config = self.get_config().await?;
            let next = config.week().saturating_add(1);
            self.set_config(WEEK_KEY, ConfigValue::from(next)).await?;
            tracing::info!(week = next, "Advanced league week");
            Ok(next)
        }
    }

    fn summary(&self) -> impl Future<Output = Result<LeagueSummary, PersistenceError>> + Send {
        async move {
            let config = self.get_config().await?;
            let teams = self.get_all_teams().await?;
            let games = self.list_games().await?;
            Ok(LeagueSummary {
                league_name: config.league_name().to_string(),
                season: config.season(),
                week: config.week(),
                teams: teams.len(),
                games_played: games.len(),
            })
        }
    }
}
