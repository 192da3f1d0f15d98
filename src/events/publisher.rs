//! Event publishers for outbound notifications

use crate::error::{BalancerError, Result};
use crate::types::{MatchBalanced, PlayerRegistered, RatingEvent, RatingsUpdated};
use crate::utils::format_probability;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

/// Trait for publishing rating events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a PlayerRegistered event
    async fn publish_player_registered(&self, event: PlayerRegistered) -> Result<()>;

    /// Publish a RatingsUpdated event
    async fn publish_ratings_updated(&self, event: RatingsUpdated) -> Result<()>;

    /// Publish a MatchBalanced event
    async fn publish_match_balanced(&self, event: MatchBalanced) -> Result<()>;
}

/// Route a union event to the matching publisher method
pub async fn publish_event(publisher: &dyn EventPublisher, event: RatingEvent) -> Result<()> {
    match event {
        RatingEvent::PlayerRegistered(event) => publisher.publish_player_registered(event).await,
        RatingEvent::RatingsUpdated(event) => publisher.publish_ratings_updated(event).await,
        RatingEvent::MatchBalanced(event) => publisher.publish_match_balanced(event).await,
    }
}

/// Publisher that relays events to the log
#[derive(Debug, Clone, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish_player_registered(&self, event: PlayerRegistered) -> Result<()> {
        info!(
            "New player: {} (rating: {})",
            event.player_id, event.display_rating
        );
        Ok(())
    }

    async fn publish_ratings_updated(&self, event: RatingsUpdated) -> Result<()> {
        info!(
            "Ratings updated! Loss: {:.3} (match {}, {})",
            event.loss, event.match_id, event.outcome
        );
        Ok(())
    }

    async fn publish_match_balanced(&self, event: MatchBalanced) -> Result<()> {
        info!(
            "Teams balanced: {} red vs {} blue, red wins {}",
            event.red_team.len(),
            event.blue_team.len(),
            format_probability(event.p_red_wins)
        );
        Ok(())
    }
}

/// Publisher that forwards events over a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelEventPublisher {
    sender: mpsc::UnboundedSender<RatingEvent>,
}

impl ChannelEventPublisher {
    /// Create a publisher and the receiving end for a subscriber
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RatingEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: RatingEvent) -> Result<()> {
        self.sender.send(event).map_err(|_| {
            BalancerError::InternalError {
                message: "event subscriber has gone away".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish_player_registered(&self, event: PlayerRegistered) -> Result<()> {
        self.send(RatingEvent::PlayerRegistered(event))
    }

    async fn publish_ratings_updated(&self, event: RatingsUpdated) -> Result<()> {
        self.send(RatingEvent::RatingsUpdated(event))
    }

    async fn publish_match_balanced(&self, event: MatchBalanced) -> Result<()> {
        self.send(RatingEvent::MatchBalanced(event))
    }
}

/// Publisher that drops everything
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_player_registered(&self, _event: PlayerRegistered) -> Result<()> {
        Ok(())
    }

    async fn publish_ratings_updated(&self, _event: RatingsUpdated) -> Result<()> {
        Ok(())
    }

    async fn publish_match_balanced(&self, _event: MatchBalanced) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    fn registration(player_id: &str) -> RatingEvent {
        RatingEvent::PlayerRegistered(PlayerRegistered {
            player_id: player_id.to_string(),
            skill: 1.0,
            display_rating: 1000,
            timestamp: current_timestamp(),
        })
    }

    #[tokio::test]
    async fn test_channel_publisher_forwards_events() {
        let (publisher, mut receiver) = ChannelEventPublisher::channel();

        publish_event(&publisher, registration("alex")).await.unwrap();

        match receiver.recv().await {
            Some(RatingEvent::PlayerRegistered(event)) => assert_eq!(event.player_id, "alex"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_channel_publisher_reports_closed_subscriber() {
        let (publisher, receiver) = ChannelEventPublisher::channel();
        drop(receiver);

        assert!(publish_event(&publisher, registration("alex")).await.is_err());
    }

    #[tokio::test]
    async fn test_tracing_and_noop_publishers_accept_everything() {
        assert!(publish_event(&TracingEventPublisher, registration("a"))
            .await
            .is_ok());
        assert!(publish_event(&NoOpEventPublisher, registration("b"))
            .await
            .is_ok());
    }
}
