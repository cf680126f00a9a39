//! Queries against the `head_to_head` table.

use sqlx::SqliteConnection;

use super::helpers::decode_count;
use crate::model::{HeadToHead, OwnerKey};
use crate::persistence::PersistenceError;

/// Count one win, creating the pair row on first use.
pub async fn increment(
    conn: &mut SqliteConnection,
    winner: &OwnerKey,
    loser: &OwnerKey,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"INSERT INTO head_to_head (winner_id, loser_id, wins) VALUES (?, ?, 1)
           ON CONFLICT(winner_id, loser_id) DO UPDATE SET wins = wins + 1"#,
    )
    .bind(winner.as_str())
    .bind(loser.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<HeadToHead, PersistenceError> {
    let rows: Vec<(String, String, i64)> =
        sqlx::query_as("SELECT winner_id, loser_id, wins FROM head_to_head")
            .fetch_all(&mut *conn)
            .await?;

    let mut h2h = HeadToHead::new();
    for (winner, loser, wins) in rows {
        h2h.insert(OwnerKey::new(winner), OwnerKey::new(loser), decode_count(wins));
    }
    Ok(h2h)
}
