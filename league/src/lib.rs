//! League state store and ranking engine.
//!
//! - [`model`]: teams, standings, games, head-to-head tallies and config.
//! - [`persistence`]: the [`LeagueStore`] contract with a SQLite and a
//!   flat-file backend, startup backend selection and the file → SQLite
//!   migration.
//! - [`ranking`]: power rankings with head-to-head tie-breaks.
//! - [`reporting`]: validating and applying a reported game.
//! - [`settings`]: data directory and database URL resolution.

pub mod model;
pub mod persistence;
pub mod ranking;
pub mod reporting;
pub mod settings;

pub use model::{
    ConfigValue, GameResult, HeadToHead, LeagueConfig, NewTeam, OwnerKey, Standing, Team,
    ValidationError,
};
pub use persistence::{
    BackendKind, FileStore, IntegrityReport, LeagueBackend, LeagueStore, LeagueSummary,
    PersistenceError,
};
pub use ranking::{compute_rankings, compute_standings, RankedTeam};
pub use reporting::{report_game, report_game_by_abbreviation, GameOutcome, GameReport};
pub use settings::Settings;
