//! In-memory rating table backed by a durable snapshot
//!
//! Skills and model parameters are held in log-space so that additive
//! updates can never make them non-positive. Every mutation is followed by
//! a full snapshot write; storage failures are logged and the in-memory
//! table stays authoritative.

use crate::error::{BalancerError, Result};
use crate::rating::model::{self, DEFAULT_SKILL};
use crate::rating::storage::{LoadOutcome, RatingSnapshot, RatingStorage};
use crate::types::{
    LeaderboardEntry, ModelParameters, PlayerHandicap, PlayerId, PlayerRegistered, RatingEvent,
};
use crate::utils::{current_timestamp, display_rating};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RatingStore {
    log_alpha: f64,
    log_beta: f64,
    log_ratings: HashMap<PlayerId, f64>,
    storage: Arc<dyn RatingStorage>,
    pending_events: Vec<RatingEvent>,
}

impl RatingStore {
    /// Create a store holding the default state, without touching storage
    pub fn new(storage: Arc<dyn RatingStorage>) -> Self {
        let defaults = RatingSnapshot::default();
        Self {
            log_alpha: defaults.log_alpha,
            log_beta: defaults.log_beta,
            log_ratings: HashMap::new(),
            storage,
            pending_events: Vec::new(),
        }
    }

    /// Create a store and load whatever state the backend holds
    pub fn open(storage: Arc<dyn RatingStorage>) -> Self {
        let mut store = Self::new(storage);
        store.load();
        store
    }

    /// Replace in-memory state with the persisted snapshot
    ///
    /// Returns `true` if persisted state was applied. A missing, unreadable
    /// or corrupt snapshot leaves the current state untouched.
    pub fn load(&mut self) -> bool {
        match self.storage.load_snapshot() {
            Ok(LoadOutcome::Loaded(snapshot)) => {
                self.log_alpha = snapshot.log_alpha;
                self.log_beta = snapshot.log_beta;
                self.log_ratings = snapshot.log_player_ratings.into_iter().collect();
                info!(
                    "Loaded ratings for {} players from {}",
                    self.log_ratings.len(),
                    self.storage.describe()
                );
                true
            }
            Ok(LoadOutcome::Missing) => {
                info!(
                    "No persisted ratings at {}, starting from defaults",
                    self.storage.describe()
                );
                false
            }
            Ok(LoadOutcome::Corrupt { reason }) => {
                warn!(
                    "Ratings at {} are corrupt, keeping in-memory state: {}",
                    self.storage.describe(),
                    reason
                );
                false
            }
            Err(e) => {
                warn!("Failed to load ratings: {}", e);
                false
            }
        }
    }

    /// Write the full state to storage
    pub fn persist(&self) -> Result<()> {
        self.storage.save_snapshot(&self.snapshot())
    }

    /// Persist, reporting failure without propagating it
    pub(crate) fn checkpoint(&self) -> bool {
        match self.persist() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save ratings to {}: {}", self.storage.describe(), e);
                false
            }
        }
    }

    pub fn snapshot(&self) -> RatingSnapshot {
        RatingSnapshot {
            log_alpha: self.log_alpha,
            log_beta: self.log_beta,
            log_player_ratings: self
                .log_ratings
                .iter()
                .map(|(id, log_rating)| (id.clone(), *log_rating))
                .collect(),
        }
    }

    /// Skill of a player, registering them first if unknown
    pub fn get_skill(&mut self, player_id: &str) -> f64 {
        self.ensure_player(player_id);
        self.log_ratings
            .get(player_id)
            .copied()
            .unwrap_or(DEFAULT_SKILL.ln())
            .exp()
    }

    /// Skill of a known player, without registering
    pub fn skill(&self, player_id: &str) -> Option<f64> {
        self.log_ratings.get(player_id).map(|l| l.exp())
    }

    pub(crate) fn log_skill(&self, player_id: &str) -> Option<f64> {
        self.log_ratings.get(player_id).copied()
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.log_ratings.contains_key(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.log_ratings.len()
    }

    /// Register a player if unknown, persisting immediately.
    /// Returns `true` if a new entry was created.
    pub fn ensure_player(&mut self, player_id: &str) -> bool {
        if self.register(player_id) {
            self.checkpoint();
            true
        } else {
            false
        }
    }

    /// Register every unknown player, persisting once.
    /// Returns the number of new entries.
    pub fn ensure_players<'a, I>(&mut self, player_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let created = player_ids
            .into_iter()
            .filter(|player_id| self.register(player_id))
            .count();
        if created > 0 {
            self.checkpoint();
        }
        created
    }

    /// Bootstrap: the first player ever gets the default skill, later ones
    /// start at the lowest skill currently held by anyone.
    fn register(&mut self, player_id: &str) -> bool {
        if self.log_ratings.contains_key(player_id) {
            return false;
        }

        let log_rating = self
            .log_ratings
            .values()
            .copied()
            .min_by(f64::total_cmp)
            .unwrap_or(DEFAULT_SKILL.ln());
        self.log_ratings.insert(player_id.to_string(), log_rating);

        let skill = log_rating.exp();
        info!("New player registered: {} (skill {:.4})", player_id, skill);
        self.pending_events.push(RatingEvent::PlayerRegistered(PlayerRegistered {
            player_id: player_id.to_string(),
            skill,
            display_rating: display_rating(skill),
            timestamp: current_timestamp(),
        }));
        true
    }

    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            alpha: self.log_alpha.exp(),
            beta: self.log_beta.exp(),
        }
    }

    pub(crate) fn log_parameters(&self) -> (f64, f64) {
        (self.log_alpha, self.log_beta)
    }

    /// Overwrite a player's skill. The value must be positive and finite.
    pub fn set_skill(&mut self, player_id: &str, skill: f64) -> Result<()> {
        self.set_log_skill(player_id, positive_log(skill, "skill")?);
        Ok(())
    }

    /// Overwrite the model parameters. Both must be positive and finite.
    pub fn set_parameters(&mut self, alpha: f64, beta: f64) -> Result<()> {
        let log_alpha = positive_log(alpha, "alpha")?;
        let log_beta = positive_log(beta, "beta")?;
        self.set_log_parameters(log_alpha, log_beta);
        Ok(())
    }

    pub(crate) fn set_log_skill(&mut self, player_id: &str, log_skill: f64) {
        self.log_ratings.insert(player_id.to_string(), log_skill);
    }

    pub(crate) fn set_log_parameters(&mut self, log_alpha: f64, log_beta: f64) {
        self.log_alpha = log_alpha;
        self.log_beta = log_beta;
    }

    /// All players, strongest first. Ties are ordered by player id.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .log_ratings
            .iter()
            .map(|(player_id, log_rating)| {
                let skill = log_rating.exp();
                LeaderboardEntry {
                    player_id: player_id.clone(),
                    skill,
                    display_rating: display_rating(skill),
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.skill
                .total_cmp(&a.skill)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        entries
    }

    /// Power of a team under the current parameters. Unknown players count
    /// at the default skill.
    pub fn team_power(&self, team: &[PlayerHandicap]) -> f64 {
        let params = self.parameters();
        model::team_power(
            team,
            |player_id| self.skill(player_id).unwrap_or(DEFAULT_SKILL),
            params.alpha,
            params.beta,
        )
    }

    /// Probability that `red` beats `blue` under the current state
    pub fn win_probability(&self, red: &[PlayerHandicap], blue: &[PlayerHandicap]) -> Result<f64> {
        model::p_first_wins(self.team_power(red), self.team_power(blue))
    }

    /// Drain notifications queued since the last call
    pub fn take_events(&mut self) -> Vec<RatingEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

impl fmt::Debug for RatingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.parameters();
        write!(
            f,
            "RatingStore(alpha={:.3}, beta={:.3}, players={}, storage={})",
            params.alpha,
            params.beta,
            self.log_ratings.len(),
            self.storage.describe()
        )
    }
}

fn positive_log(value: f64, name: &str) -> Result<f64> {
    if !(value.is_finite() && value > 0.0) {
        return Err(BalancerError::InvalidInput {
            reason: format!("{} must be positive and finite (got {})", name, value),
        }
        .into());
    }
    Ok(value.ln())
}
