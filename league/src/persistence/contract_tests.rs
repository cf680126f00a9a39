//! Behaviour both backends must share. Each property is written once against
//! [`LeagueStore`] and instantiated per backend by `store_contract!`.

use super::sqlite::{Database, SqliteStore};
use super::{FileStore, LeagueStore, PersistenceError};
use crate::model::{ConfigValue, GameResult, NewTeam, OwnerKey, Standing, ValidationError};
use crate::ranking::compute_rankings;
use crate::reporting::{report_game, GameReport};

fn owner(key: &str) -> OwnerKey {
    OwnerKey::from(key)
}

async fn open_file_store() -> (Option<tempfile::TempDir>, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    (Some(dir), store)
}

async fn open_sqlite_store() -> (Option<tempfile::TempDir>, SqliteStore) {
    let db = Database::new_in_memory().await.unwrap();
    (None, SqliteStore::new(db.pool().clone()))
}

async fn register<S: LeagueStore>(store: &S, key: &str, name: &str, abbreviation: &str) {
    store
        .create_team(&NewTeam::new(owner(key), name, abbreviation))
        .await
        .unwrap();
}

async fn play<S: LeagueStore>(store: &S, a: &str, a_score: u32, b: &str, b_score: u32) {
    report_game(store, &GameReport::new(owner(a), a_score, owner(b), b_score))
        .await
        .unwrap();
}

// ── Teams ──────────────────────────────────────────────────────────────

async fn test_create_then_get_returns_team_and_zeroed_standing<S: LeagueStore>(store: &S) {
    let created = store
        .create_team(&NewTeam::new(owner("100"), "Kansas City Chiefs", "kc").with_owner_label("alex"))
        .await
        .unwrap();
    assert_eq!(created.abbreviation, "KC");

    let fetched = store.get_team(&owner("100")).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.name, "Kansas City Chiefs");
    assert_eq!(fetched.owner_label.as_deref(), Some("alex"));
    assert_eq!(
        store.get_standing(&owner("100")).await.unwrap(),
        Some(Standing::default())
    );
}

async fn test_abbreviation_collision_ignores_case<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    let err = store
        .create_team(&NewTeam::new(owner("2"), "Completely Different", "kc"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Validation(ValidationError::AbbreviationTaken(ref a)) if a == "KC"
    ));
    assert!(store.get_team(&owner("2")).await.unwrap().is_none());
    assert!(store.get_standing(&owner("2")).await.unwrap().is_none());
}

async fn test_second_team_for_owner_is_rejected<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    let err = store
        .create_team(&NewTeam::new(owner("1"), "Bills", "BUF"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Validation(ValidationError::OwnerTaken(_))
    ));
    assert_eq!(store.get_all_teams().await.unwrap().len(), 1);
}

async fn test_invalid_abbreviation_writes_nothing<S: LeagueStore>(store: &S) {
    for bad in ["K", "KCCC", "K1", ""] {
        let err = store
            .create_team(&NewTeam::new(owner("1"), "Chiefs", bad))
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{bad:?} accepted");
    }
    assert!(store.get_all_teams().await.unwrap().is_empty());
    assert!(store.get_all_standings().await.unwrap().is_empty());
}

async fn test_delete_cascades_and_keeps_game_names<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    play(store, "1", 30, "2", 10).await;

    assert!(store.delete_team(&owner("2")).await.unwrap());

    assert!(store.get_team(&owner("2")).await.unwrap().is_none());
    assert!(!store
        .get_all_standings()
        .await
        .unwrap()
        .contains_key(&owner("2")));
    assert!(store.get_all_head_to_head().await.unwrap().is_empty());

    let games = store.list_games().await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].loser_id, None);
    assert_eq!(games[0].loser_team, "Bills");
    assert_eq!(games[0].winner_id, Some(owner("1")));
}

async fn test_delete_unknown_owner_is_a_no_op<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    assert!(!store.delete_team(&owner("9")).await.unwrap());
    assert_eq!(store.get_all_teams().await.unwrap().len(), 1);
}

async fn test_delete_by_abbreviation_returns_removed_team<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    let removed = store.delete_team_by_abbreviation("kc").await.unwrap();
    assert_eq!(removed.owner_id, owner("1"));
    assert!(store.get_all_teams().await.unwrap().is_empty());

    let err = store.delete_team_by_abbreviation("kc").await.unwrap_err();
    assert!(matches!(err, PersistenceError::AbbreviationNotFound(ref a) if a == "KC"));
}

async fn test_reassign_moves_team_standing_and_history<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    play(store, "1", 27, "2", 24).await;
    let before = store.get_team(&owner("1")).await.unwrap().unwrap();
    let standing = store.get_standing(&owner("1")).await.unwrap().unwrap();

    let moved = store
        .reassign_team(&owner("1"), &owner("3"), Some("casey"))
        .await
        .unwrap();

    assert_eq!(moved.owner_id, owner("3"));
    assert_eq!(moved.name, before.name);
    assert_eq!(moved.abbreviation, before.abbreviation);
    assert_eq!(moved.created_at, before.created_at);
    assert_eq!(moved.owner_label.as_deref(), Some("casey"));
    assert!(store.get_team(&owner("1")).await.unwrap().is_none());
    assert!(store.get_standing(&owner("1")).await.unwrap().is_none());
    assert_eq!(store.get_standing(&owner("3")).await.unwrap(), Some(standing));

    let h2h = store.get_all_head_to_head().await.unwrap();
    assert_eq!(h2h.wins(&owner("3"), &owner("2")), 1);
    assert_eq!(h2h.wins(&owner("1"), &owner("2")), 0);
    assert_eq!(store.list_games().await.unwrap()[0].winner_id, Some(owner("3")));
}

async fn test_reassign_rejects_missing_source_and_taken_target<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;

    let err = store
        .reassign_team(&owner("9"), &owner("3"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::TeamNotFound(ref o) if o == &owner("9")));

    let err = store
        .reassign_team(&owner("1"), &owner("2"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Validation(ValidationError::OwnerTaken(ref o)) if o == &owner("2")
    ));
    assert_eq!(
        store.get_team(&owner("1")).await.unwrap().map(|t| t.abbreviation),
        Some("KC".to_string())
    );
}

// ── Standings ──────────────────────────────────────────────────────────

async fn test_update_standing_replaces_values<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    let target = Standing::new(7, 3, 210, 180);
    store.update_standing(&owner("1"), &target).await.unwrap();
    store.update_standing(&owner("1"), &target).await.unwrap();
    assert_eq!(store.get_standing(&owner("1")).await.unwrap(), Some(target));

    let err = store
        .update_standing(&owner("9"), &Standing::new(1, 1, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::StandingNotFound(_)));
    assert!(err.is_not_found());
}

// ── Games ──────────────────────────────────────────────────────────────

async fn test_tied_report_mutates_nothing<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;

    let err = report_game(store, &GameReport::new(owner("1"), 21, owner("2"), 21))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Validation(ValidationError::TiedScore(21))
    ));

    let standings = store.get_all_standings().await.unwrap();
    assert!(standings.values().all(|s| *s == Standing::default()));
    assert!(store.list_games().await.unwrap().is_empty());
    assert!(store.get_all_head_to_head().await.unwrap().is_empty());
}

async fn test_report_updates_standings_game_and_head_to_head<S: LeagueStore>(store: &S) {
    register(store, "a", "Chiefs", "KC").await;
    register(store, "b", "Bills", "BUF").await;
    store.set_config("week", ConfigValue::Int(3)).await.unwrap();

    let outcome = report_game(store, &GameReport::new(owner("a"), 30, owner("b"), 10))
        .await
        .unwrap();

    assert_eq!(
        store.get_standing(&owner("a")).await.unwrap(),
        Some(Standing::new(1, 0, 30, 10))
    );
    assert_eq!(
        store.get_standing(&owner("b")).await.unwrap(),
        Some(Standing::new(0, 1, 10, 30))
    );
    assert_eq!(outcome.winner, Standing::new(1, 0, 30, 10));
    assert_eq!(outcome.loser, Standing::new(0, 1, 10, 30));

    let games = store.list_games().await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0], outcome.game);
    assert_eq!(games[0].week, 3);
    assert_eq!((games[0].winner_score, games[0].loser_score), (30, 10));
    assert_eq!((games[0].winner_abbr.as_str(), games[0].loser_abbr.as_str()), ("KC", "BUF"));

    let h2h = store.get_all_head_to_head().await.unwrap();
    assert_eq!(h2h.wins(&owner("a"), &owner("b")), 1);
    assert_eq!(h2h.wins(&owner("b"), &owner("a")), 0);
}

async fn test_record_game_leaves_standings_alone<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    let teams = store.get_all_teams().await.unwrap();
    let game = GameResult::between(1, &teams[&owner("1")], &teams[&owner("2")], 3, 0);

    store.record_game(&game).await.unwrap();

    assert_eq!(store.list_games().await.unwrap(), vec![game.clone()]);
    assert_eq!(
        store.get_standing(&owner("1")).await.unwrap(),
        Some(Standing::default())
    );

    let mut backwards = game;
    backwards.winner_score = 0;
    backwards.loser_score = 3;
    let err = store.record_game(&backwards).await.unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Validation(ValidationError::InvalidScore { .. })
    ));
}

async fn test_recent_games_are_newest_first<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    play(store, "1", 10, "2", 0).await;
    play(store, "1", 20, "2", 0).await;
    play(store, "1", 30, "2", 0).await;

    let recent = store.recent_games(2).await.unwrap();
    let scores: Vec<u32> = recent.iter().map(|g| g.winner_score).collect();
    assert_eq!(scores, vec![30, 20]);
    assert_eq!(store.recent_games(10).await.unwrap().len(), 3);
}

// ── Head-to-head ───────────────────────────────────────────────────────

async fn test_head_to_head_is_directional<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    store.record_head_to_head(&owner("1"), &owner("2")).await.unwrap();
    store.record_head_to_head(&owner("1"), &owner("2")).await.unwrap();
    store.record_head_to_head(&owner("2"), &owner("1")).await.unwrap();

    let h2h = store.get_all_head_to_head().await.unwrap();
    assert_eq!(h2h.len(), 2);
    assert_eq!(h2h.wins(&owner("1"), &owner("2")), 2);
    assert_eq!(h2h.wins(&owner("2"), &owner("1")), 1);
}

// ── Config ─────────────────────────────────────────────────────────────

async fn test_config_defaults_and_round_trip<S: LeagueStore>(store: &S) {
    let config = store.get_config().await.unwrap();
    assert_eq!(config.league_name(), "Madden Franchise League");
    assert_eq!(config.admin_role(), "League Admin");
    assert_eq!(config.season(), 1);
    assert_eq!(config.week(), 1);

    store.set_config("season", ConfigValue::from("2")).await.unwrap();
    store
        .set_config("league_name", ConfigValue::from("Sunday League"))
        .await
        .unwrap();
    let config = store.get_config().await.unwrap();
    assert_eq!(config.get("season"), Some(&ConfigValue::Int(2)));
    assert_eq!(config.league_name(), "Sunday League");

    let err = store
        .set_config("week", ConfigValue::from("soon"))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.get_config().await.unwrap().week(), 1);
}

async fn test_advance_week_and_summary<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    play(store, "1", 14, "2", 7).await;

    assert_eq!(store.advance_week().await.unwrap(), 2);
    assert_eq!(store.advance_week().await.unwrap(), 3);

    let summary = store.summary().await.unwrap();
    assert_eq!(summary.week, 3);
    assert_eq!(summary.season, 1);
    assert_eq!(summary.teams, 2);
    assert_eq!(summary.games_played, 1);
}

async fn test_reset_clears_league_data_and_keeps_config<S: LeagueStore>(store: &S) {
    register(store, "1", "Chiefs", "KC").await;
    register(store, "2", "Bills", "BUF").await;
    play(store, "1", 14, "2", 7).await;
    store.set_config("week", ConfigValue::Int(9)).await.unwrap();

    assert_eq!(store.reset_league().await.unwrap(), 2);
    assert!(store.get_all_teams().await.unwrap().is_empty());
    assert!(store.get_all_standings().await.unwrap().is_empty());
    assert!(store.list_games().await.unwrap().is_empty());
    assert!(store.get_all_head_to_head().await.unwrap().is_empty());
    assert_eq!(store.get_config().await.unwrap().week(), 9);

    // The freed owner and abbreviation can register again.
    register(store, "2", "Chiefs", "KC").await;
    assert_eq!(store.reset_league().await.unwrap(), 1);
    assert_eq!(store.reset_league().await.unwrap(), 0);
}

// ── Ranking over stored data ───────────────────────────────────────────

async fn test_rankings_follow_reported_games<S: LeagueStore>(store: &S) {
    register(store, "a", "Chiefs", "KC").await;
    register(store, "b", "Bills", "BUF").await;
    register(store, "c", "Eagles", "PHI").await;
    register(store, "d", "Jets", "NYJ").await;
    // b and c both finish 2-1. b edged c by a point, c has the far better
    // differential.
    play(store, "a", 21, "b", 20).await;
    play(store, "b", 1, "c", 0).await;
    play(store, "c", 50, "d", 0).await;
    play(store, "b", 1, "d", 0).await;
    play(store, "c", 50, "d", 0).await;
    play(store, "a", 3, "d", 0).await;
    play(store, "a", 3, "d", 0).await;

    let teams = store.get_all_teams().await.unwrap();
    let standings = store.get_all_standings().await.unwrap();
    let h2h = store.get_all_head_to_head().await.unwrap();
    let ranked = compute_rankings(&teams, &standings, &h2h);
    let order: Vec<&str> = ranked.iter().map(|r| r.team.abbreviation.as_str()).collect();
    assert_eq!(order, vec!["KC", "BUF", "PHI", "NYJ"]);
}

macro_rules! store_contract {
    ($backend:ident, $open:ident) => {
        mod $backend {
            store_contract!(@tests $open;
                test_create_then_get_returns_team_and_zeroed_standing,
                test_abbreviation_collision_ignores_case,
                test_second_team_for_owner_is_rejected,
                test_invalid_abbreviation_writes_nothing,
                test_delete_cascades_and_keeps_game_names,
                test_delete_unknown_owner_is_a_no_op,
                test_delete_by_abbreviation_returns_removed_team,
                test_reassign_moves_team_standing_and_history,
                test_reassign_rejects_missing_source_and_taken_target,
                test_update_standing_replaces_values,
                test_tied_report_mutates_nothing,
                test_report_updates_standings_game_and_head_to_head,
                test_record_game_leaves_standings_alone,
                test_recent_games_are_newest_first,
                test_head_to_head_is_directional,
                test_config_defaults_and_round_trip,
                test_advance_week_and_summary,
                test_reset_clears_league_data_and_keeps_config,
                test_rankings_follow_reported_games,
            );
        }
    };
    (@tests $open:ident; $($name:ident),* $(,)?) => {
        $(
            #[tokio::test]
            async fn $name() {
                let (_dir, store) = super::$open().await;
                super::$name(&store).await;
            }
        )*
    };
}

store_contract!(file_store, open_file_store);
store_contract!(sqlite_store, open_sqlite_store);
