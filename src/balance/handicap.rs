//! Handicap escalation for the disfavored side
//!
//! Starting from the best unhandicapped split, the weaker side's players
//! are raised one handicap level at a time, weakest first, round-robin,
//! until the weaker side's win probability reaches 0.5. At that point the
//! final step is kept only if it lands at least as close to 0.5 as the
//! state before it.

use crate::balance::split::EvenSplit;
use crate::error::Result;
use crate::rating::model::{self, DEFAULT_SKILL};
use crate::rating::store::RatingStore;
use crate::types::{BalancedMatch, PlayerHandicap, Side};
use tracing::debug;

/// Splits closer than this to 0.5 are returned without handicaps
pub const NEAR_BALANCE_TOLERANCE: f64 = 0.001;

/// Add handicaps to the disfavored side of `split`
///
/// Teams are always reported red/blue in the split's order. If the
/// disfavored side has no players there is nothing to escalate and the
/// split is returned unchanged. If every disfavored player reaches the
/// maximum level without crossing 0.5, the fully escalated state is
/// returned.
pub fn escalate_handicaps(store: &RatingStore, split: EvenSplit) -> Result<BalancedMatch> {
    if split.imbalance() < NEAR_BALANCE_TOLERANCE {
        return Ok(split.into());
    }

    let disfavored_side = if split.p_red_wins < 0.5 {
        Side::Red
    } else {
        Side::Blue
    };
    let disfavored_len = match disfavored_side {
        Side::Red => split.red_team.len(),
        Side::Blue => split.blue_team.len(),
    };
    if disfavored_len == 0 {
        debug!("Disfavored side is empty, returning split without handicaps");
        return Ok(split.into());
    }

    let EvenSplit {
        red_team,
        blue_team,
        p_red_wins,
    } = split;
    let (mut disfavored, favored) = match disfavored_side {
        Side::Red => (red_team, blue_team),
        Side::Blue => (blue_team, red_team),
    };

    // Weakest first; the sort is stable so equal skills keep roster order
    let skill_of = |slot: &PlayerHandicap| store.skill(&slot.player_id).unwrap_or(DEFAULT_SKILL);
    disfavored.sort_by(|a, b| skill_of(a).total_cmp(&skill_of(b)));

    let favored_power = store.team_power(&favored);
    let red_probability = |disfavored: &[PlayerHandicap]| -> Result<f64> {
        let disfavored_power = store.team_power(disfavored);
        match disfavored_side {
            Side::Red => model::p_first_wins(disfavored_power, favored_power),
            Side::Blue => model::p_first_wins(favored_power, disfavored_power),
        }
    };
    let disfavored_probability = |p_red: f64| match disfavored_side {
        Side::Red => p_red,
        Side::Blue => 1.0 - p_red,
    };

    let mut previous_team = disfavored.clone();
    let mut previous_p_red = p_red_wins;
    let mut cursor = 0;

    loop {
        let Some(next_level) = disfavored[cursor].handicap.increment() else {
            cursor = (cursor + 1) % disfavored.len();
            if disfavored.iter().all(|slot| slot.handicap.is_max()) {
                debug!("All disfavored players at maximum handicap");
                break;
            }
            continue;
        };

        disfavored[cursor].handicap = next_level;
        let p_red = red_probability(&disfavored)?;
        debug!(
            "Handicap {} -> {}: p_red={:.4}",
            disfavored[cursor].player_id, next_level, p_red
        );
        cursor = (cursor + 1) % disfavored.len();

        let p_disfavored = disfavored_probability(p_red);
        if p_disfavored >= 0.5 {
            let overshoot = (p_disfavored - 0.5).abs();
            let before = (disfavored_probability(previous_p_red) - 0.5).abs();
            if before < overshoot {
                disfavored = previous_team;
            } else {
                previous_p_red = p_red;
            }
            break;
        }

        previous_team = disfavored.clone();
        previous_p_red = p_red;
    }

    let (red_team, blue_team) = match disfavored_side {
        Side::Red => (disfavored, favored),
        Side::Blue => (favored, disfavored),
    };
    Ok(BalancedMatch {
        red_team,
        blue_team,
        p_red_wins: previous_p_red,
    })
}
