//! Common types used throughout the rating and balancing engine

use crate::error::BalancerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for players, stable across sessions
pub type PlayerId = String;

/// Unique identifier for a rated match
pub type MatchId = Uuid;

/// An ordered team roster
pub type Team = Vec<PlayerHandicap>;

/// Per-match handicap level. Higher levels boost a player's effective skill.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Handicap(u8);

impl Handicap {
    pub const NONE: Handicap = Handicap(0);
    pub const MAX: Handicap = Handicap(4);

    pub fn new(level: u8) -> Result<Self, BalancerError> {
        if level > Self::MAX.0 {
            return Err(BalancerError::InvalidHandicap {
                level: level as i64,
            });
        }
        Ok(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self.0 >= Self::MAX.0
    }

    /// Next level up, or `None` once the cap is reached
    pub fn increment(self) -> Option<Self> {
        if self.is_max() {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }
}

impl TryFrom<u8> for Handicap {
    type Error = BalancerError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Handicap> for u8 {
    fn from(handicap: Handicap) -> Self {
        handicap.0
    }
}

impl fmt::Display for Handicap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player slotted into a team for one match
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerHandicap {
    pub player_id: PlayerId,
    pub handicap: Handicap,
}

impl PlayerHandicap {
    pub fn new(player_id: impl Into<PlayerId>, handicap: Handicap) -> Self {
        Self {
            player_id: player_id.into(),
            handicap,
        }
    }

    pub fn unhandicapped(player_id: impl Into<PlayerId>) -> Self {
        Self::new(player_id, Handicap::NONE)
    }
}

/// Roster notation: `name` or `name:level`
impl fmt::Display for PlayerHandicap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.handicap == Handicap::NONE {
            write!(f, "{}", self.player_id)
        } else {
            write!(f, "{}:{}", self.player_id, self.handicap)
        }
    }
}

impl FromStr for PlayerHandicap {
    type Err = BalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, level) = match s.rsplit_once(':') {
            Some((name, level)) => {
                let level: i64 = level.trim().parse().map_err(|_| {
                    BalancerError::InvalidInput {
                        reason: format!("Invalid handicap in roster entry '{}'", s),
                    }
                })?;
                let level = u8::try_from(level)
                    .map_err(|_| BalancerError::InvalidHandicap { level })?;
                (name, Handicap::new(level)?)
            }
            None => (s, Handicap::NONE),
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(BalancerError::InvalidInput {
                reason: format!("Empty player name in roster entry '{}'", s),
            });
        }

        Ok(Self::new(name, level))
    }
}

/// One of the two sides of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Red,
    Blue,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Red => write!(f, "Red"),
            Side::Blue => write!(f, "Blue"),
        }
    }
}

/// Observed result of a finished match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    Winner(Side),
    Tie,
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::Winner(side) => write!(f, "{} wins", side),
            MatchOutcome::Tie => write!(f, "Tie"),
        }
    }
}

impl FromStr for MatchOutcome {
    type Err = BalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "red" => Ok(MatchOutcome::Winner(Side::Red)),
            "blue" => Ok(MatchOutcome::Winner(Side::Blue)),
            "tie" | "draw" | "neutral" => Ok(MatchOutcome::Tie),
            _ => Err(BalancerError::UnknownOutcome { tag: s.to_string() }),
        }
    }
}

/// Global model hyperparameters, exposed as positive values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Team-power concentration exponent
    pub alpha: f64,
    /// Handicap-sensitivity exponent
    pub beta: f64,
}

/// Result of a balance query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancedMatch {
    pub red_team: Team,
    pub blue_team: Team,
    /// Predicted probability that the red team wins
    pub p_red_wins: f64,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub skill: f64,
    pub display_rating: i64,
}

/// Summary of a rated match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub match_id: MatchId,
    pub outcome: MatchOutcome,
    /// Surprisal of the outcome before the update (0 for ties)
    pub loss: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Event emitted when a player is seen for the first time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRegistered {
    pub player_id: PlayerId,
    pub skill: f64,
    pub display_rating: i64,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted after a match result has been applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingsUpdated {
    pub match_id: MatchId,
    pub outcome: MatchOutcome,
    pub loss: f64,
    pub parameters: ModelParameters,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when balanced teams have been computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBalanced {
    pub red_team: Team,
    pub blue_team: Team,
    pub p_red_wins: f64,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RatingEvent {
    PlayerRegistered(PlayerRegistered),
    RatingsUpdated(RatingsUpdated),
    MatchBalanced(MatchBalanced),
}
