//! Balanced team assignment for an arbitrary roster

use crate::balance::handicap::escalate_handicaps;
use crate::balance::split::{best_even_split, split_count};
use crate::error::{BalancerError, Result};
use crate::rating::store::RatingStore;
use crate::types::{BalancedMatch, PlayerHandicap, PlayerId};
use std::collections::HashSet;
use tracing::info;

/// Default ceiling on roster size for the exhaustive split search
pub const DEFAULT_MAX_ROSTER_SIZE: usize = 20;

/// Computes the most even red/blue split with handicaps
#[derive(Debug, Clone)]
pub struct MatchBalancer {
    max_roster_size: usize,
}

impl Default for MatchBalancer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROSTER_SIZE)
    }
}

impl MatchBalancer {
    pub fn new(max_roster_size: usize) -> Self {
        Self { max_roster_size }
    }

    pub fn max_roster_size(&self) -> usize {
        self.max_roster_size
    }

    /// Check a roster before any state is touched
    pub fn validate_roster(&self, players: &[PlayerId]) -> Result<()> {
        if players.is_empty() {
            return Err(BalancerError::InvalidInput {
                reason: "roster must contain at least one player".to_string(),
            }
            .into());
        }

        if players.len() > self.max_roster_size {
            return Err(BalancerError::RosterTooLarge {
                size: players.len(),
                max: self.max_roster_size,
            }
            .into());
        }

        let mut seen = HashSet::new();
        for player_id in players {
            if player_id.trim().is_empty() {
                return Err(BalancerError::InvalidInput {
                    reason: "player names must not be empty".to_string(),
                }
                .into());
            }
            if !seen.insert(player_id.as_str()) {
                return Err(BalancerError::InvalidInput {
                    reason: format!("player {} appears more than once", player_id),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Register unknown players, find the most even split, then escalate
    /// handicaps on the weaker side
    pub fn balance(&self, store: &mut RatingStore, players: &[PlayerId]) -> Result<BalancedMatch> {
        self.validate_roster(players)?;

        store.ensure_players(players.iter().map(String::as_str));

        info!(
            "Balancing {} players ({} candidate splits)",
            players.len(),
            split_count(players.len())
        );
        let split = best_even_split(store, players)?;
        let result = escalate_handicaps(store, split)?;

        info!(
            "Balanced match: red [{}] vs blue [{}], p_red={:.4}",
            format_team(&result.red_team),
            format_team(&result.blue_team),
            result.p_red_wins
        );
        Ok(result)
    }
}

fn format_team(team: &[PlayerHandicap]) -> String {
    team.iter()
        .map(|slot| slot.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rating::storage::{InMemoryRatingStorage, RatingSnapshot};
    use crate::types::Handicap;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn fresh_store() -> RatingStore {
        RatingStore::new(Arc::new(InMemoryRatingStorage::new()))
    }

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_balance_registers_unknown_players() {
        let mut store = fresh_store();
        let balancer = MatchBalancer::default();

        let result = balancer.balance(&mut store, &ids(&["x", "y"])).unwrap();
        assert!(store.has_player("x"));
        assert!(store.has_player("y"));
        assert_eq!(result.p_red_wins, 0.5);
    }

    #[test]
    fn test_rejects_invalid_rosters() {
        let mut store = fresh_store();
        let balancer = MatchBalancer::new(4);

        assert!(balancer.balance(&mut store, &[]).is_err());
        assert!(balancer.balance(&mut store, &ids(&["a", "a"])).is_err());
        assert!(balancer.balance(&mut store, &ids(&["a", " "])).is_err());

        let err = balancer
            .balance(&mut store, &ids(&["a", "b", "c", "d", "e"]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BalancerError>(),
            Some(BalancerError::RosterTooLarge { size: 5, max: 4 })
        ));

        // Rejected calls must not register anyone
        assert_eq!(store.player_count(), 0);
    }

    #[test]
    fn test_out_of_range_stored_ratings_are_dropped() {
        let snapshot =
            RatingSnapshot::from_json_lenient(r#"{"logPlayerRatings": {"a": 800.0, "b": 0.0}}"#)
                .unwrap();
        let mut store = RatingStore::open(Arc::new(InMemoryRatingStorage::with_snapshot(snapshot)));
        assert!(!store.has_player("a"));

        let result = MatchBalancer::default()
            .balance(&mut store, &ids(&["a", "b"]))
            .unwrap();

        // a is bootstrapped at b's rating instead of loading as infinity
        assert_eq!(store.skill("a"), Some(1.0));
        assert_eq!(result.p_red_wins, 0.5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_balance_assigns_everyone_within_limits(
            skills in proptest::collection::vec(0.05f64..20.0, 1..8)
        ) {
            let mut store = fresh_store();
            let players: Vec<PlayerId> = (0..skills.len()).map(|i| format!("p{}", i)).collect();
            for (player_id, skill) in players.iter().zip(&skills) {
                store.set_skill(player_id, *skill).unwrap();
            }

            let result = MatchBalancer::default().balance(&mut store, &players).unwrap();

            let mut assigned: Vec<&str> = result
                .red_team
                .iter()
                .chain(&result.blue_team)
                .map(|slot| slot.player_id.as_str())
                .collect();
            assigned.sort();
            let mut expected: Vec<&str> = players.iter().map(String::as_str).collect();
            expected.sort();
            prop_assert_eq!(assigned, expected);

            prop_assert_eq!(result.red_team.len(), players.len() / 2);
            for slot in result.red_team.iter().chain(&result.blue_team) {
                prop_assert!(slot.handicap <= Handicap::MAX);
            }
            prop_assert!((0.0..=1.0).contains(&result.p_red_wins));
        }
    }
}
