//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use skill_balancer::error::Result;
use skill_balancer::events::EventPublisher;
use skill_balancer::types::{MatchBalanced, PlayerRegistered, RatingEvent, RatingsUpdated};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock event publisher that captures published events for testing
#[derive(Debug, Default)]
pub struct MockEventPublisher {
    published_events: Arc<Mutex<Vec<RatingEvent>>>,
}

impl MockEventPublisher {
    pub fn new() -> Self {
        Self {
            published_events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get all published events (for testing)
    pub fn get_published_events(&self) -> Vec<RatingEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events of specific type
    pub fn count_events_of_type(&self, event_type: &str) -> usize {
        self.get_published_events()
            .iter()
            .filter(|event| match event {
                RatingEvent::PlayerRegistered(_) => event_type == "PlayerRegistered",
                RatingEvent::RatingsUpdated(_) => event_type == "RatingsUpdated",
                RatingEvent::MatchBalanced(_) => event_type == "MatchBalanced",
            })
            .count()
    }

    fn record(&self, event: RatingEvent) {
        if let Ok(mut events) = self.published_events.lock() {
            events.push(event);
        }
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish_player_registered(&self, event: PlayerRegistered) -> Result<()> {
        self.record(RatingEvent::PlayerRegistered(event));
        Ok(())
    }

    async fn publish_ratings_updated(&self, event: RatingsUpdated) -> Result<()> {
        self.record(RatingEvent::RatingsUpdated(event));
        Ok(())
    }

    async fn publish_match_balanced(&self, event: MatchBalanced) -> Result<()> {
        self.record(RatingEvent::MatchBalanced(event));
        Ok(())
    }
}

/// Ratings file path in a fresh directory that does not exist yet
pub struct TempRatingsFile {
    dir: PathBuf,
}

impl TempRatingsFile {
    pub fn new() -> Self {
        Self {
            dir: std::env::temp_dir().join(format!("skill-balancer-it-{}", Uuid::new_v4())),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("elo_ratings.json")
    }
}

impl Drop for TempRatingsFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}
