//! Queries against the `config` table. Values are stored as text and
//! normalized on the way out.

use sqlx::SqliteConnection;

use crate::model::{ConfigValue, LeagueConfig};
use crate::persistence::PersistenceError;

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<LeagueConfig, PersistenceError> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM config")
        .fetch_all(&mut *conn)
        .await?;

    Ok(LeagueConfig::from_values(
        rows.into_iter()
            .map(|(key, value)| (key, ConfigValue::Text(value))),
    ))
}

/// Write an already-normalized value.
pub async fn upsert(
    conn: &mut SqliteConnection,
    key: &str,
    value: &ConfigValue,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"INSERT INTO config (key, value) VALUES (?, ?)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value"#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
