//! Integration tests for the skill-balancer engine
//!
//! These tests drive the engine against a real ratings file:
//! - Defaults and bootstrap behavior on a fresh file
//! - Persistence across engine restarts
//! - Team balancing with handicaps
//! - Learning from repeated results
//! - Event publishing and recovery from corrupt files

mod fixtures;

use approx::assert_abs_diff_eq;
use skill_balancer::config::AppConfig;
use skill_balancer::rating::{JsonFileRatingStorage, RatingStore};
use skill_balancer::types::{Handicap, MatchOutcome, PlayerHandicap, Side};
use skill_balancer::{MatchBalancer, RatingEngine};
use std::sync::Arc;

use fixtures::{MockEventPublisher, TempRatingsFile};

/// Engine on a ratings file with a capturing publisher
fn create_test_engine(file: &TempRatingsFile) -> (RatingEngine, Arc<MockEventPublisher>) {
    let publisher = Arc::new(MockEventPublisher::new());
    let engine = RatingEngine::open(
        Arc::new(JsonFileRatingStorage::new(file.path())),
        publisher.clone(),
        MatchBalancer::default(),
    );
    (engine, publisher)
}

fn slot(player_id: &str) -> PlayerHandicap {
    PlayerHandicap::unhandicapped(player_id)
}

fn roster(players: &[&str]) -> Vec<String> {
    players.iter().map(|p| p.to_string()).collect()
}

/// Write explicit skills to the ratings file before the engine opens it
fn seed_skills(file: &TempRatingsFile, skills: &[(&str, f64)]) {
    let mut store = RatingStore::open(Arc::new(JsonFileRatingStorage::new(file.path())));
    for (player_id, skill) in skills {
        store.set_skill(player_id, *skill).unwrap();
    }
    store.persist().unwrap();
}

#[tokio::test]
async fn test_fresh_file_starts_from_defaults() {
    let file = TempRatingsFile::new();
    let (engine, publisher) = create_test_engine(&file);

    let params = engine.parameters().await;
    assert_abs_diff_eq!(params.alpha, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(params.beta, 1.0 / 1.5, epsilon = 1e-12);
    assert!(!file.path().exists());

    assert_abs_diff_eq!(engine.get_skill("newplayer").await.unwrap(), 1.0, epsilon = 1e-12);

    // Registration is persisted immediately
    assert!(file.path().exists());
    assert_eq!(publisher.count_events_of_type("PlayerRegistered"), 1);
}

#[tokio::test]
async fn test_new_players_start_at_weakest_rating() {
    let file = TempRatingsFile::new();
    seed_skills(&file, &[("strong", 3.0), ("weak", 0.4)]);
    let (engine, _) = create_test_engine(&file);

    assert_abs_diff_eq!(engine.get_skill("rookie").await.unwrap(), 0.4, epsilon = 1e-12);
}

#[tokio::test]
async fn test_ratings_survive_restart() {
    let file = TempRatingsFile::new();

    let (before, after_alpha, after_beta) = {
        let (engine, _) = create_test_engine(&file);
        engine
            .record_match(
                &[slot("alice"), slot("bob")],
                &[slot("carol"), PlayerHandicap::new("dave", Handicap::new(2).unwrap())],
                MatchOutcome::Winner(Side::Blue),
            )
            .await
            .unwrap();
        let params = engine.parameters().await;
        (engine.leaderboard().await, params.alpha, params.beta)
    };

    let (engine, publisher) = create_test_engine(&file);
    let params = engine.parameters().await;
    assert_eq!(params.alpha, after_alpha);
    assert_eq!(params.beta, after_beta);
    assert_eq!(engine.leaderboard().await, before);

    for entry in &before {
        assert!(engine.has_player(&entry.player_id).await);
        assert_eq!(engine.get_skill(&entry.player_id).await.unwrap(), entry.skill);
    }
    // Known players are not announced again
    assert_eq!(publisher.count_events_of_type("PlayerRegistered"), 0);
}

#[tokio::test]
async fn test_balance_hands_handicaps_to_weaker_side() {
    let file = TempRatingsFile::new();
    seed_skills(&file, &[("A", 1.0), ("B", 1.0), ("C", 4.0)]);
    let (engine, publisher) = create_test_engine(&file);

    let result = engine.balance(&roster(&["A", "B", "C"])).await.unwrap();

    let level3 = Handicap::new(3).unwrap();
    assert_eq!(result.red_team, vec![slot("C")]);
    assert_eq!(
        result.blue_team,
        vec![
            PlayerHandicap::new("A", level3),
            PlayerHandicap::new("B", level3)
        ]
    );

    // C alone has power 4^2 = 16 against (2 / 0.4^(2/3))^2
    let blue_power = (2.0 / 0.4f64.powf(1.0 / 1.5)).powi(2);
    assert_abs_diff_eq!(result.p_red_wins, 16.0 / (16.0 + blue_power), epsilon = 1e-9);
    assert!(result.p_red_wins > 0.5 && result.p_red_wins < 0.55);

    // The reported probability matches the engine's own prediction
    let p_red = engine
        .win_probability(&result.red_team, &result.blue_team)
        .await
        .unwrap();
    assert_abs_diff_eq!(p_red, result.p_red_wins, epsilon = 1e-12);

    assert_eq!(publisher.count_events_of_type("MatchBalanced"), 1);
}

#[tokio::test]
async fn test_balance_equal_pair_is_even() {
    let file = TempRatingsFile::new();
    let (engine, publisher) = create_test_engine(&file);

    let result = engine.balance(&roster(&["x", "y"])).await.unwrap();

    assert_eq!(result.p_red_wins, 0.5);
    assert_eq!(result.red_team, vec![slot("x")]);
    assert_eq!(result.blue_team, vec![slot("y")]);
    assert_eq!(publisher.count_events_of_type("PlayerRegistered"), 2);
    assert_eq!(publisher.count_events_of_type("MatchBalanced"), 1);
}

#[tokio::test]
async fn test_balance_rejects_bad_rosters() {
    let file = TempRatingsFile::new();
    let publisher = Arc::new(MockEventPublisher::new());
    let engine = RatingEngine::open(
        Arc::new(JsonFileRatingStorage::new(file.path())),
        publisher.clone(),
        MatchBalancer::new(4),
    );

    assert!(engine.balance(&[]).await.is_err());
    assert!(engine.balance(&roster(&["a", "b", "a"])).await.is_err());
    assert!(engine.balance(&roster(&["a", "b", "c", "d", "e"])).await.is_err());

    assert!(publisher.get_published_events().is_empty());
    assert!(!engine.has_player("a").await);
}

#[tokio::test]
async fn test_tie_leaves_ratings_untouched() {
    let file = TempRatingsFile::new();
    seed_skills(&file, &[("a", 1.5), ("b", 0.8)]);
    let (engine, publisher) = create_test_engine(&file);
    let before = engine.leaderboard().await;
    let params_before = engine.parameters().await;

    let report = engine
        .record_match(&[slot("a")], &[slot("b")], MatchOutcome::Tie)
        .await
        .unwrap();

    assert_eq!(report.loss, 0.0);
    assert_eq!(engine.leaderboard().await, before);
    assert_eq!(engine.parameters().await, params_before);
    assert_eq!(publisher.count_events_of_type("RatingsUpdated"), 0);
}

#[tokio::test]
async fn test_repeated_wins_increase_confidence() {
    let file = TempRatingsFile::new();
    let (engine, publisher) = create_test_engine(&file);

    let mut previous = 0.5;
    for _ in 0..30 {
        engine
            .record_match(&[slot("a")], &[slot("b")], MatchOutcome::Winner(Side::Red))
            .await
            .unwrap();

        let p_red = engine.win_probability(&[slot("a")], &[slot("b")]).await.unwrap();
        assert!(p_red > previous);
        previous = p_red;
    }

    assert!(previous > 0.9);
    assert!(engine.get_skill("a").await.unwrap() > 1.0);
    assert!(engine.get_skill("b").await.unwrap() < 1.0);

    let leaderboard = engine.leaderboard().await;
    assert_eq!(leaderboard[0].player_id, "a");
    assert_eq!(leaderboard[1].player_id, "b");
    assert_eq!(publisher.count_events_of_type("RatingsUpdated"), 30);
}

#[tokio::test]
async fn test_update_reduces_loss_for_observed_result() {
    let file = TempRatingsFile::new();
    seed_skills(&file, &[("a", 1.3), ("b", 0.7), ("c", 2.1), ("d", 0.9)]);
    let (engine, _) = create_test_engine(&file);

    let red = vec![
        PlayerHandicap::new("a", Handicap::new(1).unwrap()),
        PlayerHandicap::new("b", Handicap::new(3).unwrap()),
    ];
    let blue = vec![slot("c"), slot("d")];

    let p_before = engine.win_probability(&red, &blue).await.unwrap();
    let report = engine
        .record_match(&red, &blue, MatchOutcome::Winner(Side::Red))
        .await
        .unwrap();
    let p_after = engine.win_probability(&red, &blue).await.unwrap();

    assert_abs_diff_eq!(report.loss, -(p_before + 1e-10).ln(), epsilon = 1e-9);
    assert!(p_after > p_before);
}

#[tokio::test]
async fn test_corrupt_file_is_replaced_on_next_save() {
    let file = TempRatingsFile::new();
    std::fs::create_dir_all(file.path().parent().unwrap()).unwrap();
    std::fs::write(file.path(), "this is not json").unwrap();

    let (engine, _) = create_test_engine(&file);
    let params = engine.parameters().await;
    assert_abs_diff_eq!(params.alpha, 2.0, epsilon = 1e-12);
    assert!(engine.leaderboard().await.is_empty());

    engine
        .record_match(&[slot("a")], &[slot("b")], MatchOutcome::Winner(Side::Blue))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(file.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(json["logAlpha"].is_number());
    assert!(json["logBeta"].is_number());
    assert!(json["logPlayerRatings"]["a"].is_number());
    assert!(json["logPlayerRatings"]["b"].is_number());
}

#[tokio::test]
async fn test_engine_from_config_uses_configured_file() {
    let file = TempRatingsFile::new();
    let mut config = AppConfig::default();
    config.storage.ratings_path = file.path();
    config.storage.pretty_print = false;

    let engine = RatingEngine::from_config(&config);
    engine.get_skill("solo").await.unwrap();

    let raw = std::fs::read_to_string(file.path()).unwrap();
    assert!(!raw.contains('\n'));
    assert!(raw.contains("\"solo\""));
}
