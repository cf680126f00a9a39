//! SQLite-backed league store.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: allows one writer and multiple concurrent readers.
//! - **Foreign keys enabled**: standings and head-to-head rows cascade with
//!   their team; game rows keep their names and lose the owner reference.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   when the database is opened. The schema is idempotent and seeds the
//!   default config keys.
//!
//! ## Store
//!
//! [`SqliteStore`] holds a clone of the pool and implements
//! [`LeagueStore`](crate::persistence::LeagueStore). Each operation borrows one
//! connection (or one transaction) from the pool for its duration. Queries are
//! grouped by table in the `*_repo` modules. Paired writes (team + standing,
//! reassignment, game application) each run in a single transaction.
//!
//! ## File migration
//!
//! [`migrate_files_to_sqlite`] copies a [`FileStore`](crate::persistence::FileStore)
//! into a SQLite store once, entity by entity, and reports before/after
//! counts. The source files are left untouched.

mod config_repo;
mod database;
mod game_repo;
mod head_to_head_repo;
pub(crate) mod helpers;
mod migrate_files;
mod standing_repo;
mod store;
mod team_repo;

pub use database::Database;
pub use migrate_files::{migrate_files_to_sqlite, EntityCounts, MigrationReport};
pub use store::SqliteStore;
