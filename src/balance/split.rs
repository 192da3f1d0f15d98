//! Exhaustive search for the most even unhandicapped split

use crate::error::{BalancerError, Result};
use crate::rating::model::{self, DEFAULT_SKILL};
use crate::rating::store::RatingStore;
use crate::types::{BalancedMatch, Handicap, PlayerHandicap, PlayerId, Team};
use itertools::Itertools;
use tracing::debug;

/// Best split found by [`best_even_split`]
#[derive(Debug, Clone, PartialEq)]
pub struct EvenSplit {
    pub red_team: Team,
    pub blue_team: Team,
    pub p_red_wins: f64,
}

impl EvenSplit {
    /// Distance of the predicted outcome from a coin flip
    pub fn imbalance(&self) -> f64 {
        (self.p_red_wins - 0.5).abs()
    }
}

impl From<EvenSplit> for BalancedMatch {
    fn from(split: EvenSplit) -> Self {
        Self {
            red_team: split.red_team,
            blue_team: split.blue_team,
            p_red_wins: split.p_red_wins,
        }
    }
}

/// Number of candidate splits examined for a roster of `n` players
pub fn split_count(n: usize) -> u128 {
    let k = (n / 2) as u128;
    let n = n as u128;
    (0..k).fold(1u128, |acc, i| acc * (n - i) / (i + 1))
}

/// Try every way of putting `floor(n/2)` players on red, all unhandicapped,
/// and keep the split whose red win probability is closest to 0.5.
///
/// Candidates are visited in lexicographic order of red-side indices and
/// only a strictly better candidate replaces the current best, so the
/// earliest of equally good splits wins. All players must already be known
/// to the store.
pub fn best_even_split(store: &RatingStore, players: &[PlayerId]) -> Result<EvenSplit> {
    if players.is_empty() {
        return Err(BalancerError::InvalidInput {
            reason: "cannot split an empty roster".to_string(),
        }
        .into());
    }

    let params = store.parameters();
    let contributions: Vec<f64> = players
        .iter()
        .map(|player_id| {
            let skill = store.skill(player_id).unwrap_or(DEFAULT_SKILL);
            model::effective_skill(skill, Handicap::NONE, params.beta)
        })
        .collect();

    let n = players.len();
    let red_size = n / 2;
    let mut best: Option<(Vec<usize>, f64)> = None;

    for red_indices in (0..n).combinations(red_size) {
        let red_total: f64 = red_indices.iter().map(|&i| contributions[i]).sum();
        let blue_total: f64 = (0..n)
            .filter(|i| !red_indices.contains(i))
            .map(|i| contributions[i])
            .sum();
        let p_red = model::p_first_wins(
            red_total.powf(params.alpha),
            blue_total.powf(params.alpha),
        )?;

        let improves = match &best {
            Some((_, best_p)) => (p_red - 0.5).abs() < (best_p - 0.5).abs(),
            None => true,
        };
        if improves {
            best = Some((red_indices, p_red));
        }
    }

    let (red_indices, p_red_wins) = best.ok_or_else(|| BalancerError::InternalError {
        message: "split search produced no candidates".to_string(),
    })?;

    let (red_team, blue_team): (Team, Team) = players
        .iter()
        .enumerate()
        .map(|(i, player_id)| (i, PlayerHandicap::unhandicapped(player_id.clone())))
        .partition_map(|(i, slot)| {
            if red_indices.contains(&i) {
                itertools::Either::Left(slot)
            } else {
                itertools::Either::Right(slot)
            }
        });

    debug!(
        "Best even split of {} players: red {:?}, p_red={:.4}",
        n, red_indices, p_red_wins
    );

    Ok(EvenSplit {
        red_team,
        blue_team,
        p_red_wins,
    })
}
