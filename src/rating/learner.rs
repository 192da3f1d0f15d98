//! Online learning from match results
//!
//! After each decisive match the surprisal of the observed winner is reduced
//! by one gradient-descent step in log-space. Gradients are estimated with a
//! symmetric finite difference, first for `log(alpha)`, then for `log(beta)`
//! (using the freshly updated alpha), then for each participant's log-skill.
//! Player gradients all see the same pre-update skills and the updated
//! parameters, and are committed together.

use crate::error::{BalancerError, Result};
use crate::rating::model::{self, DEFAULT_SKILL};
use crate::rating::store::RatingStore;
use crate::types::{MatchOutcome, PlayerHandicap, PlayerId, Side};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Step used for the symmetric difference quotient
pub const FINITE_DIFFERENCE_STEP: f64 = 1e-4;

/// Fixed gradient-descent step size
pub const LEARNING_RATE: f64 = 0.1;

/// Guards the surprisal against `ln(0)`
pub const LOSS_EPSILON: f64 = 1e-10;

/// Surprisal of `winner` given log-space parameters and participant log-skills
pub fn match_loss(
    red: &[PlayerHandicap],
    blue: &[PlayerHandicap],
    winner: Side,
    log_skills: &HashMap<PlayerId, f64>,
    log_alpha: f64,
    log_beta: f64,
) -> Result<f64> {
    let (alpha, beta) = (log_alpha.exp(), log_beta.exp());
    let skill_of = |player_id: &PlayerId| {
        log_skills
            .get(player_id)
            .map(|log_skill| log_skill.exp())
            .unwrap_or(DEFAULT_SKILL)
    };

    let red_power = model::team_power(red, skill_of, alpha, beta);
    let blue_power = model::team_power(blue, skill_of, alpha, beta);
    let p_red = model::p_first_wins(red_power, blue_power)?;

    let p_winner = match winner {
        Side::Red => p_red,
        Side::Blue => 1.0 - p_red,
    };
    Ok(-(p_winner + LOSS_EPSILON).ln())
}

fn central_difference<F>(mut loss_at: F, theta: f64) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let plus = loss_at(theta + FINITE_DIFFERENCE_STEP)?;
    let minus = loss_at(theta - FINITE_DIFFERENCE_STEP)?;
    Ok((plus - minus) / (2.0 * FINITE_DIFFERENCE_STEP))
}

/// Apply one match result to the store and persist it
///
/// Returns the surprisal of the outcome before the update, or 0 for a tie
/// (which changes nothing). Unknown participants are registered first.
pub fn update(
    store: &mut RatingStore,
    red: &[PlayerHandicap],
    blue: &[PlayerHandicap],
    outcome: MatchOutcome,
) -> Result<f64> {
    let winner = match outcome {
        MatchOutcome::Tie => {
            debug!("Tie recorded, ratings unchanged");
            return Ok(0.0);
        }
        MatchOutcome::Winner(side) => side,
    };

    if red.is_empty() && blue.is_empty() {
        return Err(BalancerError::DegenerateMatch {
            reason: "cannot rate a match with no players".to_string(),
        }
        .into());
    }

    store.ensure_players(red.iter().chain(blue).map(|slot| slot.player_id.as_str()));

    let participants: BTreeSet<&PlayerId> =
        red.iter().chain(blue).map(|slot| &slot.player_id).collect();
    let log_skills: HashMap<PlayerId, f64> = participants
        .iter()
        .map(|player_id| {
            let log_skill = store
                .log_skill(player_id)
                .unwrap_or_else(|| DEFAULT_SKILL.ln());
            ((*player_id).clone(), log_skill)
        })
        .collect();
    let (mut log_alpha, mut log_beta) = store.log_parameters();

    let loss = match_loss(red, blue, winner, &log_skills, log_alpha, log_beta)?;

    let grad_alpha = central_difference(
        |theta| match_loss(red, blue, winner, &log_skills, theta, log_beta),
        log_alpha,
    )?;
    log_alpha -= LEARNING_RATE * grad_alpha;

    let grad_beta = central_difference(
        |theta| match_loss(red, blue, winner, &log_skills, log_alpha, theta),
        log_beta,
    )?;
    log_beta -= LEARNING_RATE * grad_beta;

    // Every player's gradient is taken against the pre-pass skills
    let mut scratch = log_skills.clone();
    let mut updated_skills: HashMap<PlayerId, f64> = HashMap::with_capacity(participants.len());
    for player_id in &participants {
        let original = log_skills[*player_id];
        let grad = central_difference(
            |theta| {
                scratch.insert((*player_id).clone(), theta);
                match_loss(red, blue, winner, &scratch, log_alpha, log_beta)
            },
            original,
        )?;
        scratch.insert((*player_id).clone(), original);

        let updated = original - LEARNING_RATE * grad;
        debug!(
            "Player {}: log-skill {:.6} -> {:.6} (grad {:.6})",
            player_id, original, updated, grad
        );
        updated_skills.insert((*player_id).clone(), updated);
    }
    let log_skills = updated_skills;

    let all_usable = model::is_usable_log(log_alpha)
        && model::is_usable_log(log_beta)
        && log_skills.values().all(|v| model::is_usable_log(*v));
    if !all_usable {
        return Err(BalancerError::InternalError {
            message: "rating update produced a non-finite value; state left unchanged"
                .to_string(),
        }
        .into());
    }

    store.set_log_parameters(log_alpha, log_beta);
    for (player_id, log_skill) in &log_skills {
        store.set_log_skill(player_id, *log_skill);
    }
    store.checkpoint();

    info!(
        "Ratings updated after {} ({} players, loss={:.4})",
        outcome,
        participants.len(),
        loss
    );
    Ok(loss)
}
