//! Skill ratings: the power model, persistent store and online learner
//!
//! This module provides team power and win probability calculations, the
//! log-space rating table with its storage backends, and the gradient step
//! applied after each match.

pub mod learner;
pub mod model;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use learner::{match_loss, update};
pub use model::{p_first_wins, team_power, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_SKILL};
pub use storage::{
    InMemoryRatingStorage, JsonFileRatingStorage, LoadOutcome, MockRatingStorage, RatingSnapshot,
    RatingStorage,
};
pub use store::RatingStore;
