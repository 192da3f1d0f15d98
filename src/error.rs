//! Error types for the rating and balancing engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating and balancing scenarios
#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid handicap level {level} (expected 0..=4)")]
    InvalidHandicap { level: i64 },

    #[error("Unknown match outcome: {tag}")]
    UnknownOutcome { tag: String },

    #[error("Degenerate match: {reason}")]
    DegenerateMatch { reason: String },

    #[error("Roster of {size} players exceeds the limit of {max}")]
    RosterTooLarge { size: usize, max: usize },

    #[error("Rating storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
