//! Utility functions for the rating engine

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique match ID
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Integer rating shown to players: skill scaled by 1000, truncated
pub fn display_rating(skill: f64) -> i64 {
    (skill * 1000.0) as i64
}

/// Format a probability as a percentage with one decimal
pub fn format_probability(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}
