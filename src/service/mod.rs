//! Service layer for the skill-balancer engine
//!
//! This module contains the engine facade that serializes rating queries,
//! match updates and balance computations and relays their notifications.

pub mod engine;

pub use engine::RatingEngine;
