//! League persistence.
//!
//! [`LeagueStore`] is the backend-agnostic contract. It is implemented by
//! [`FileStore`] (one JSON document per collection) and
//! [`sqlite::SqliteStore`]. [`LeagueBackend`] holds whichever one was selected
//! at startup and is what callers pass around.

mod backend;
mod file_store;
mod json_document;
pub mod sqlite;
mod traits;

#[cfg(test)]
mod contract_tests;

pub use backend::{BackendKind, LeagueBackend};
pub use file_store::{FileStore, IntegrityReport};
pub use traits::{LeagueStore, LeagueSummary};

use crate::model::{OwnerKey, ValidationError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no team registered for owner {0}")]
    TeamNotFound(OwnerKey),
    #[error("no team with abbreviation {0}")]
    AbbreviationNotFound(String),
    #[error("no standing recorded for owner {0}")]
    StandingNotFound(OwnerKey),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
}

impl PersistenceError {
    /// A user input problem; nothing was written.
    pub fn is_validation(&self) -> bool {
        matches!(self, PersistenceError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PersistenceError::TeamNotFound(_)
                | PersistenceError::AbbreviationNotFound(_)
                | PersistenceError::StandingNotFound(_)
        )
    }
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
