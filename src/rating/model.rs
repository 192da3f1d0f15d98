//! Team power and win probability
//!
//! A player's effective skill is `skill / (1 - handicap/5)^beta`, a team's
//! power is `(sum of effective skills)^alpha`, and the probability that the
//! first team wins is `power_a / (power_a + power_b)`.

use crate::error::{BalancerError, Result};
use crate::types::{Handicap, PlayerHandicap, PlayerId};

/// Default team-power concentration exponent
pub const DEFAULT_ALPHA: f64 = 2.0;

/// Default handicap-sensitivity exponent
pub const DEFAULT_BETA: f64 = 1.0 / 1.5;

/// Skill assigned to the very first registered player
pub const DEFAULT_SKILL: f64 = 1.0;

/// Denominator of the handicap fraction
const HANDICAP_SCALE: f64 = 5.0;

/// Effective contribution of one player
pub fn effective_skill(skill: f64, handicap: Handicap, beta: f64) -> f64 {
    let divisor = (1.0 - handicap.level() as f64 / HANDICAP_SCALE).powf(beta);
    skill / divisor
}

/// Aggregate power of a team. An empty team has power 0.
pub fn team_power<F>(team: &[PlayerHandicap], skill_of: F, alpha: f64, beta: f64) -> f64
where
    F: Fn(&PlayerId) -> f64,
{
    let total: f64 = team
        .iter()
        .map(|slot| effective_skill(skill_of(&slot.player_id), slot.handicap, beta))
        .sum();
    total.powf(alpha)
}

/// Probability that the side with `power_a` beats the side with `power_b`
///
/// Fails when both powers are zero or when either overflows, since the
/// ratio is undefined.
pub fn p_first_wins(power_a: f64, power_b: f64) -> Result<f64> {
    let total = power_a + power_b;
    let p = power_a / total;
    if !(total > 0.0 && total.is_finite() && p.is_finite()) {
        return Err(BalancerError::DegenerateMatch {
            reason: format!(
                "combined team power must be positive and finite (got {} + {})",
                power_a, power_b
            ),
        }
        .into());
    }
    Ok(p)
}

/// Whether a log-space value maps to a strictly positive, finite quantity
pub fn is_usable_log(log_value: f64) -> bool {
    let value = log_value.exp();
    value.is_finite() && value > 0.0
}
