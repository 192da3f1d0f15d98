//! Skill Balancer - skill ratings and handicap-aware team balancing
//!
//! This crate tracks a latent skill per player, predicts win probability
//! for two-team matches, learns from match results one gradient step at a
//! time, and computes the most even team split with per-player handicaps.

pub mod balance;
pub mod config;
pub mod error;
pub mod events;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{BalancerError, Result};
pub use types::*;

// Re-export key components
pub use balance::MatchBalancer;
pub use events::EventPublisher;
pub use rating::{RatingStorage, RatingStore};
pub use service::RatingEngine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
