//! Queries against the `games` table.

use sqlx::SqliteConnection;

use super::helpers::{decode_count, decode_timestamp};
use crate::model::{GameResult, OwnerKey};
use crate::persistence::PersistenceError;

#[derive(sqlx::FromRow)]
struct GameRow {
    week: i64,
    winner_id: Option<String>,
    loser_id: Option<String>,
    winner_team: String,
    winner_abbr: String,
    loser_team: String,
    loser_abbr: String,
    winner_score: i64,
    loser_score: i64,
    date: i64,
}

impl From<GameRow> for GameResult {
    fn from(r: GameRow) -> Self {
        Self {
            week: decode_count(r.week),
            winner_id: r.winner_id.map(OwnerKey::new),
            loser_id: r.loser_id.map(OwnerKey::new),
            winner_team: r.winner_team,
            winner_abbr: r.winner_abbr,
            loser_team: r.loser_team,
            loser_abbr: r.loser_abbr,
            winner_score: decode_count(r.winner_score),
            loser_score: decode_count(r.loser_score),
            played_at: decode_timestamp(r.date),
        }
    }
}

pub async fn insert(conn: &mut SqliteConnection, game: &GameResult) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"INSERT INTO games
           (week, winner_id, loser_id, winner_team, winner_abbr, loser_team, loser_abbr,
            winner_score, loser_score, date)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(game.week as i64)
    .bind(game.winner_id.as_ref().map(OwnerKey::as_str))
    .bind(game.loser_id.as_ref().map(OwnerKey::as_str))
    .bind(&game.winner_team)
    .bind(&game.winner_abbr)
    .bind(&game.loser_team)
    .bind(&game.loser_abbr)
    .bind(game.winner_score as i64)
    .bind(game.loser_score as i64)
    .bind(game.played_at as i64)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// All games, oldest first. Rows with the same date keep insertion order.
pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<GameResult>, PersistenceError> {
    let rows = sqlx::query_as::<_, GameRow>(
        r#"SELECT week, winner_id, loser_id, winner_team, winner_abbr, loser_team, loser_abbr,
                  winner_score, loser_score, date
           FROM games ORDER BY id ASC"#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(GameResult::from).collect())
}

/// The last `limit` games recorded, newest first.
pub async fn fetch_recent(
    conn: &mut SqliteConnection,
    limit: usize,
) -> Result<Vec<GameResult>, PersistenceError> {
    let rows = sqlx::query_as::<_, GameRow>(
        r#"SELECT week, winner_id, loser_id, winner_team, winner_abbr, loser_team, loser_abbr,
                  winner_score, loser_score, date
           FROM games ORDER BY id DESC LIMIT ?"#,
    )
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(GameResult::from).collect())
}

pub async fn delete_all(conn: &mut SqliteConnection) -> Result<u64, PersistenceError> {
    let result = sqlx::query("DELETE FROM games").execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
