//! Team balancing
//!
//! This module finds the most even red/blue split of a roster and then
//! escalates per-player handicaps on the weaker side.

pub mod balancer;
pub mod handicap;
pub mod split;

// Re-export commonly used types
pub use balancer::{MatchBalancer, DEFAULT_MAX_ROSTER_SIZE};
pub use handicap::{escalate_handicaps, NEAR_BALANCE_TOLERANCE};
pub use split::{best_even_split, split_count, EvenSplit};
