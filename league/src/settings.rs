//! Runtime settings for the league store.
//!
//! Handles backend configuration with the following precedence:
//! 1. Explicit overrides (CLI flags)
//! 2. `LEAGUE_DATA_DIR` / `DATABASE_URL` environment variables
//! 3. The platform data directory (e.g. `~/.local/share/league`)
//! 4. `./data` (fallback for development)
//!
//! Without a database URL only the file store is used.

use std::path::{Path, PathBuf};

const DATA_DIR_ENV: &str = "LEAGUE_DATA_DIR";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const DEV_DATA_DIR: &str = "./data";

/// Where league data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    data_dir: PathBuf,
    database_url: Option<String>,
}

impl Settings {
    /// Build settings from the environment.
    pub fn from_env() -> Self {
        Self {
            data_dir: resolve_data_dir(std::env::var(DATA_DIR_ENV).ok(), platform_data_dir()),
            database_url: non_empty(std::env::var(DATABASE_URL_ENV).ok()),
        }
    }

    /// Settings for a file store in `data_dir` with no database.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database_url: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = non_empty(Some(url.into()));
        self
    }

    /// Directory holding the JSON documents of the file store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Database URL, if a relational backend is configured.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}

fn platform_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "league").map(|dirs| dirs.data_dir().to_path_buf())
}

fn resolve_data_dir(env_dir: Option<String>, platform_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = non_empty(env_dir) {
        return PathBuf::from(dir);
    }
    platform_dir.unwrap_or_else(|| PathBuf::from(DEV_DATA_DIR))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
