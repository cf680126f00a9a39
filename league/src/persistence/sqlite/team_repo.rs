//! Queries against the `teams` table.

use sqlx::SqliteConnection;
use std::collections::BTreeMap;

use super::helpers::{decode_timestamp, unique_violation_column};
use crate::model::{OwnerKey, Team, ValidationError};
use crate::persistence::PersistenceError;

#[derive(sqlx::FromRow)]
struct TeamRow {
    user_id: String,
    name: String,
    abbreviation: String,
    owner_label: Option<String>,
    created_at: i64,
}

impl From<TeamRow> for Team {
    fn from(r: TeamRow) -> Self {
        Self {
            name: r.name,
            abbreviation: r.abbreviation,
            owner_label: r.owner_label,
            owner_id: OwnerKey::new(r.user_id),
            created_at: decode_timestamp(r.created_at),
        }
    }
}

pub async fn fetch_all(
    conn: &mut SqliteConnection,
) -> Result<BTreeMap<OwnerKey, Team>, PersistenceError> {
    let rows = sqlx::query_as::<_, TeamRow>(
        "SELECT user_id, name, abbreviation, owner_label, created_at FROM teams",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(Team::from)
        .map(|team| (team.owner_id.clone(), team))
        .collect())
}

pub async fn fetch_one(
    conn: &mut SqliteConnection,
    owner: &OwnerKey,
) -> Result<Option<Team>, PersistenceError> {
    let row = sqlx::query_as::<_, TeamRow>(
        "SELECT user_id, name, abbreviation, owner_label, created_at FROM teams WHERE user_id = ?",
    )
    .bind(owner.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Team::from))
}

/// The column is `COLLATE NOCASE`, so the comparison ignores case.
pub async fn abbreviation_in_use(
    conn: &mut SqliteConnection,
    abbreviation: &str,
) -> Result<bool, PersistenceError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM teams WHERE abbreviation = ?")
        .bind(abbreviation)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// Insert a validated team. Constraint violations that slipped past the
/// pre-checks are reported as the matching validation error.
pub async fn insert(conn: &mut SqliteConnection, team: &Team) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"INSERT INTO teams (user_id, name, abbreviation, owner_label, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(team.owner_id.as_str())
    .bind(&team.name)
    .bind(&team.abbreviation)
    .bind(&team.owner_label)
    .bind(team.created_at as i64)
    .execute(&mut *conn)
    .await
    .map_err(|e| match unique_violation_column(&e).as_deref() {
        Some("teams.abbreviation") => PersistenceError::from(ValidationError::AbbreviationTaken(
            team.abbreviation.clone(),
        )),
        Some("teams.user_id") => {
            PersistenceError::from(ValidationError::OwnerTaken(team.owner_id.clone()))
        }
        _ => PersistenceError::from(e),
    })?;
    Ok(())
}

/// Move the team row to a new owner key. Standings, head-to-head and game
/// references follow through `ON UPDATE CASCADE`.
pub async fn rekey(
    conn: &mut SqliteConnection,
    from: &OwnerKey,
    to: &OwnerKey,
    owner_label: Option<&str>,
) -> Result<bool, PersistenceError> {
    let result = sqlx::query("UPDATE teams SET user_id = ?, owner_label = ? WHERE user_id = ?")
        .bind(to.as_str())
        .bind(owner_label)
        .bind(from.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| match unique_violation_column(&e) {
            Some(_) => PersistenceError::from(ValidationError::OwnerTaken(to.clone())),
            None => PersistenceError::from(e),
        })?;
    Ok(result.rows_affected() > 0)
}

/// Delete every team. Standings and head-to-head rows go with them.
pub async fn delete_all(conn: &mut SqliteConnection) -> Result<u64, PersistenceError> {
    let result = sqlx::query("DELETE FROM teams").execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Delete the team row. Standings and head-to-head rows cascade; games keep
/// their names and have the owner reference set to NULL.
pub async fn delete(conn: &mut SqliteConnection, owner: &OwnerKey) -> Result<bool, PersistenceError> {
    let result = sqlx::query("DELETE FROM teams WHERE user_id = ?")
        .bind(owner.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
