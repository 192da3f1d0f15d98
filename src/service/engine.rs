//! Rating engine facade
//!
//! This module contains the `RatingEngine` that owns the rating store,
//! serializes every operation behind one lock, and relays notifications to
//! an event publisher once each operation has completed.

use crate::balance::MatchBalancer;
use crate::config::AppConfig;
use crate::error::{BalancerError, Result};
use crate::events::{publish_event, EventPublisher, TracingEventPublisher};
use crate::rating::{learner, JsonFileRatingStorage, RatingStorage, RatingStore};
use crate::types::{
    BalancedMatch, LeaderboardEntry, MatchBalanced, MatchOutcome, MatchReport, ModelParameters,
    PlayerHandicap, PlayerId, RatingEvent, RatingsUpdated,
};
use crate::utils::{current_timestamp, generate_match_id};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Skill rating and balancing engine
pub struct RatingEngine {
    store: Arc<Mutex<RatingStore>>,
    balancer: MatchBalancer,
    publisher: Arc<dyn EventPublisher>,
}

impl RatingEngine {
    /// Open the engine, loading whatever state the storage holds
    pub fn open(
        storage: Arc<dyn RatingStorage>,
        publisher: Arc<dyn EventPublisher>,
        balancer: MatchBalancer,
    ) -> Self {
        let store = RatingStore::open(storage);
        info!("Rating engine ready: {:?}", store);
        Self {
            store: Arc::new(Mutex::new(store)),
            balancer,
            publisher,
        }
    }

    /// Engine backed by the configured JSON file, relaying events to the log
    pub fn from_config(config: &AppConfig) -> Self {
        let storage = JsonFileRatingStorage::new(&config.storage.ratings_path)
            .with_pretty_print(config.storage.pretty_print);
        Self::open(
            Arc::new(storage),
            Arc::new(TracingEventPublisher),
            MatchBalancer::new(config.balance.max_roster_size),
        )
    }

    /// Skill of a player, registering them if unknown
    pub async fn get_skill(&self, player_id: &str) -> Result<f64> {
        validate_player_id(player_id)?;
        let (skill, events) = {
            let mut store = self.store.lock().await;
            let skill = store.get_skill(player_id);
            (skill, store.take_events())
        };
        self.relay(events).await;
        Ok(skill)
    }

    /// Current model parameters
    pub async fn parameters(&self) -> ModelParameters {
        self.store.lock().await.parameters()
    }

    pub async fn has_player(&self, player_id: &str) -> bool {
        self.store.lock().await.has_player(player_id)
    }

    /// All known players, strongest first
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.store.lock().await.leaderboard()
    }

    /// Predicted probability that `red` beats `blue`, registering unknown
    /// players first
    pub async fn win_probability(
        &self,
        red: &[PlayerHandicap],
        blue: &[PlayerHandicap],
    ) -> Result<f64> {
        validate_rosters(red, blue)?;
        let (p_red, events) = {
            let mut store = self.store.lock().await;
            store.ensure_players(red.iter().chain(blue).map(|slot| slot.player_id.as_str()));
            let p_red = store.win_probability(red, blue);
            (p_red, store.take_events())
        };
        self.relay(events).await;
        p_red
    }

    /// Apply a finished match to the ratings
    ///
    /// The update, including persisting it, completes before any other
    /// engine call can observe the store.
    pub async fn record_match(
        &self,
        red: &[PlayerHandicap],
        blue: &[PlayerHandicap],
        outcome: MatchOutcome,
    ) -> Result<MatchReport> {
        validate_rosters(red, blue)?;
        let start_time = Instant::now();

        let red_team = red.to_vec();
        let blue_team = blue.to_vec();
        let (loss, parameters, mut events) = self
            .with_store_blocking(move |store| {
                let loss = learner::update(store, &red_team, &blue_team, outcome);
                let events = store.take_events();
                (loss, store.parameters(), events)
            })
            .await?;

        let loss = match loss {
            Ok(loss) => loss,
            Err(e) => {
                self.relay(events).await;
                return Err(e);
            }
        };

        let report = MatchReport {
            match_id: generate_match_id(),
            outcome,
            loss,
            recorded_at: current_timestamp(),
        };
        debug!(
            "Match {} recorded in {:.2}ms",
            report.match_id,
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        if outcome != MatchOutcome::Tie {
            events.push(RatingEvent::RatingsUpdated(RatingsUpdated {
                match_id: report.match_id,
                outcome,
                loss,
                parameters,
                timestamp: report.recorded_at,
            }));
        }
        self.relay(events).await;

        Ok(report)
    }

    /// Compute balanced teams with handicaps for a roster
    pub async fn balance(&self, players: &[PlayerId]) -> Result<BalancedMatch> {
        let start_time = Instant::now();

        let balancer = self.balancer.clone();
        let roster = players.to_vec();
        let (result, mut events) = self
            .with_store_blocking(move |store| {
                let result = balancer.balance(store, &roster);
                (result, store.take_events())
            })
            .await?;

        if let Ok(balanced) = &result {
            debug!(
                "Balanced {} players in {:.2}ms",
                players.len(),
                start_time.elapsed().as_secs_f64() * 1000.0
            );
            events.push(RatingEvent::MatchBalanced(MatchBalanced {
                red_team: balanced.red_team.clone(),
                blue_team: balanced.blue_team.clone(),
                p_red_wins: balanced.p_red_wins,
                timestamp: current_timestamp(),
            }));
        }
        self.relay(events).await;

        result
    }

    /// Run a CPU- or disk-bound operation on the blocking pool while holding
    /// the store lock
    async fn with_store_blocking<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut RatingStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut store = Arc::clone(&self.store).lock_owned().await;
        tokio::task::spawn_blocking(move || op(&mut *store))
            .await
            .map_err(|e| {
                BalancerError::InternalError {
                    message: format!("store task failed: {}", e),
                }
                .into()
            })
    }

    /// Publish queued events; publishing failures are reported, not raised
    async fn relay(&self, events: Vec<RatingEvent>) {
        for event in events {
            if let Err(e) = publish_event(self.publisher.as_ref(), event).await {
                warn!("Failed to publish rating event: {}", e);
            }
        }
    }
}

fn validate_player_id(player_id: &str) -> Result<()> {
    if player_id.trim().is_empty() {
        return Err(BalancerError::InvalidInput {
            reason: "player names must not be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_rosters(red: &[PlayerHandicap], blue: &[PlayerHandicap]) -> Result<()> {
    if red.is_empty() && blue.is_empty() {
        return Err(BalancerError::DegenerateMatch {
            reason: "both teams are empty".to_string(),
        }
        .into());
    }
    for slot in red.iter().chain(blue) {
        validate_player_id(&slot.player_id)?;
    }
    Ok(())
}
