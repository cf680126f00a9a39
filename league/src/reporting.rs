//! Reporting a played game.
//!
//! A report names two owners and their scores. It is checked before anything
//! is written: both owners must have a team, they must differ, and the scores
//! must not be tied. The higher score wins. The game is then applied through
//! [`LeagueStore::apply_game`], which bumps both standings, appends the game
//! record and counts the head-to-head win as one unit.

use tracing::info;

use crate::model::{GameResult, OwnerKey, Standing, Team, ValidationError};
use crate::persistence::{LeagueStore, PersistenceError};

/// Two owners and the score each of them put up. Order does not matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameReport {
    /// Week the game belongs to; `None` uses the league's current week.
    pub week: Option<u32>,
    pub first: OwnerKey,
    pub first_score: u32,
    pub second: OwnerKey,
    pub second_score: u32,
}

impl GameReport {
    pub fn new(first: OwnerKey, first_score: u32, second: OwnerKey, second_score: u32) -> Self {
        Self {
            week: None,
            first,
            first_score,
            second,
            second_score,
        }
    }

    pub fn in_week(mut self, week: u32) -> Self {
        self.week = Some(week);
        self
    }
}

/// The recorded game and both teams' standings afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub game: GameResult,
    pub winner: Standing,
    pub loser: Standing,
}

pub async fn report_game<S: LeagueStore>(
    store: &S,
    report: &GameReport,
) -> Result<GameOutcome, PersistenceError> {
    let first = require_team(store, &report.first).await?;
    let second = require_team(store, &report.second).await?;
    if first.owner_id == second.owner_id {
        return Err(ValidationError::SelfMatchup.into());
    }
    if report.first_score == report.second_score {
        return Err(ValidationError::TiedScore(report.first_score).into());
    }

    let week = match report.week {
        Some(week) => week,
        None => store.get_config().await?.week(),
    };
    let game = if report.first_score > report.second_score {
        GameResult::between(week, &first, &second, report.first_score, report.second_score)
    } else {
        GameResult::between(week, &second, &first, report.second_score, report.first_score)
    };

    let (winner, loser) = store.apply_game(&game).await?;
    info!(
        week,
        winner = %game.winner_abbr,
        loser = %game.loser_abbr,
        winner_score = game.winner_score,
        loser_score = game.loser_score,
        "Recorded game"
    );
    Ok(GameOutcome { game, winner, loser })
}

/// Report a game from one owner's side, naming the opponent by abbreviation.
pub async fn report_game_by_abbreviation<S: LeagueStore>(
    store: &S,
    reporter: &OwnerKey,
    reporter_score: u32,
    opponent_abbreviation: &str,
    opponent_score: u32,
    week: Option<u32>,
) -> Result<GameOutcome, PersistenceError> {
    let opponent = store
        .find_team_by_abbreviation(opponent_abbreviation)
        .await?
        .ok_or_else(|| {
            PersistenceError::AbbreviationNotFound(opponent_abbreviation.trim().to_ascii_uppercase())
        })?;

    let report = GameReport {
        week,
        first: reporter.clone(),
        first_score: reporter_score,
        second: opponent.owner_id,
        second_score: opponent_score,
    };
    report_game(store, &report).await
}

async fn require_team<S: LeagueStore>(store: &S, owner: &OwnerKey) -> Result<Team, PersistenceError> {
    store
        .get_team(owner)
        .await?
        .ok_or_else(|| PersistenceError::TeamNotFound(owner.clone()))
}
