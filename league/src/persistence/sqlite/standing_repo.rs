//! Queries against the `standings` table.

use sqlx::SqliteConnection;
use std::collections::BTreeMap;

use super::helpers::decode_count;
use crate::model::{OwnerKey, Standing};
use crate::persistence::PersistenceError;

#[derive(sqlx::FromRow)]
struct StandingRow {
    user_id: String,
    wins: i64,
    losses: i64,
    points_for: i64,
    points_against: i64,
}

impl StandingRow {
    fn into_pair(self) -> (OwnerKey, Standing) {
        (
            OwnerKey::new(self.user_id),
            Standing::new(
                decode_count(self.wins),
                decode_count(self.losses),
                decode_count(self.points_for),
                decode_count(self.points_against),
            ),
        )
    }
}

pub async fn fetch_all(
    conn: &mut SqliteConnection,
) -> Result<BTreeMap<OwnerKey, Standing>, PersistenceError> {
    let rows = sqlx::query_as::<_, StandingRow>(
        "SELECT user_id, wins, losses, points_for, points_against FROM standings",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(StandingRow::into_pair).collect())
}

pub async fn fetch_one(
    conn: &mut SqliteConnection,
    owner: &OwnerKey,
) -> Result<Option<Standing>, PersistenceError> {
    let row = sqlx::query_as::<_, StandingRow>(
        r#"SELECT user_id, wins, losses, points_for, points_against
           FROM standings WHERE user_id = ?"#,
    )
    .bind(owner.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.into_pair().1))
}

/// Insert the all-zero standing for a freshly created team.
pub async fn insert_zeroed(
    conn: &mut SqliteConnection,
    owner: &OwnerKey,
) -> Result<(), PersistenceError> {
    sqlx::query("INSERT INTO standings (user_id) VALUES (?)")
        .bind(owner.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Overwrite all four counters. Returns `false` if the owner has no row.
pub async fn replace(
    conn: &mut SqliteConnection,
    owner: &OwnerKey,
    standing: &Standing,
) -> Result<bool, PersistenceError> {
    let result = sqlx::query(
        r#"UPDATE standings
           SET wins = ?, losses = ?, points_for = ?, points_against = ?
           WHERE user_id = ?"#,
    )
    .bind(standing.wins as i64)
    .bind(standing.losses as i64)
    .bind(standing.points_for as i64)
    .bind(standing.points_against as i64)
    .bind(owner.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Add one result in place. `won` selects whether the win or the loss
/// counter moves. Returns `false` if the owner has no row.
pub async fn add_result(
    conn: &mut SqliteConnection,
    owner: &OwnerKey,
    won: bool,
    scored: u32,
    conceded: u32,
) -> Result<bool, PersistenceError> {
    let sql = if won {
        r#"UPDATE standings
           SET wins = wins + 1, points_for = points_for + ?, points_against = points_against + ?
           WHERE user_id = ?"#
    } else {
        r#"UPDATE standings
           SET losses = losses + 1, points_for = points_for + ?, points_against = points_against + ?
           WHERE user_id = ?"#
    };
    let result = sqlx::query(sql)
        .bind(scored as i64)
        .bind(conceded as i64)
        .bind(owner.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
