//! Rating persistence interface and implementations
//!
//! This module defines the durable snapshot format and the backends that
//! read and write it: a JSON file for production use plus in-memory and
//! mock implementations for tests.

use crate::error::{BalancerError, Result};
use crate::rating::model::{is_usable_log, DEFAULT_ALPHA, DEFAULT_BETA};
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Whole persisted state, all values in log-space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSnapshot {
    pub log_alpha: f64,
    pub log_beta: f64,
    pub log_player_ratings: BTreeMap<PlayerId, f64>,
}

impl Default for RatingSnapshot {
    fn default() -> Self {
        Self {
            log_alpha: DEFAULT_ALPHA.ln(),
            log_beta: DEFAULT_BETA.ln(),
            log_player_ratings: BTreeMap::new(),
        }
    }
}

impl RatingSnapshot {
    /// Decode a snapshot, falling back to defaults field by field
    ///
    /// Only a document that is not a JSON object at all is rejected.
    pub fn from_json_lenient(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| BalancerError::Storage {
            message: format!("ratings file is not valid JSON: {}", e),
        })?;
        let Value::Object(fields) = value else {
            return Err(BalancerError::Storage {
                message: "ratings file does not contain a JSON object".to_string(),
            }
            .into());
        };

        let mut snapshot = Self::default();

        match fields.get("logAlpha").map(usable_log) {
            Some(Some(log_alpha)) => snapshot.log_alpha = log_alpha,
            Some(None) => warn!("Ignoring malformed logAlpha, using default"),
            None => {}
        }
        match fields.get("logBeta").map(usable_log) {
            Some(Some(log_beta)) => snapshot.log_beta = log_beta,
            Some(None) => warn!("Ignoring malformed logBeta, using default"),
            None => {}
        }
        match fields.get("logPlayerRatings") {
            Some(Value::Object(ratings)) => {
                for (player_id, raw_rating) in ratings {
                    match usable_log(raw_rating) {
                        Some(log_rating) => {
                            snapshot
                                .log_player_ratings
                                .insert(player_id.clone(), log_rating);
                        }
                        None => warn!("Skipping malformed rating for player {}", player_id),
                    }
                }
            }
            Some(_) => warn!("Ignoring malformed logPlayerRatings, starting with no players"),
            None => {}
        }

        Ok(snapshot)
    }
}

/// A log-space number whose exponential is a positive finite value
fn usable_log(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| is_usable_log(*v))
}

/// What a storage backend found when asked to load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing has been persisted yet
    Missing,
    /// A usable snapshot (possibly with defaulted fields)
    Loaded(RatingSnapshot),
    /// The stored state exists but could not be decoded at all
    Corrupt { reason: String },
}

/// Trait for rating persistence operations
pub trait RatingStorage: Send + Sync {
    /// Read the full persisted state
    fn load_snapshot(&self) -> Result<LoadOutcome>;

    /// Replace the full persisted state
    fn save_snapshot(&self, snapshot: &RatingSnapshot) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// JSON file storage, rewritten in full on every save
#[derive(Debug, Clone)]
pub struct JsonFileRatingStorage {
    path: PathBuf,
    pretty: bool,
}

impl JsonFileRatingStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
        }
    }

    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ratings.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RatingStorage for JsonFileRatingStorage {
    fn load_snapshot(&self) -> Result<LoadOutcome> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ratings file at {}", self.path.display());
                return Ok(LoadOutcome::Missing);
            }
            Err(e) => {
                return Err(BalancerError::Storage {
                    message: format!("Failed to read {}: {}", self.path.display(), e),
                }
                .into())
            }
        };

        match RatingSnapshot::from_json_lenient(&raw) {
            Ok(snapshot) => Ok(LoadOutcome::Loaded(snapshot)),
            Err(e) => Ok(LoadOutcome::Corrupt {
                reason: e.to_string(),
            }),
        }
    }

    fn save_snapshot(&self, snapshot: &RatingSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| BalancerError::Storage {
                    message: format!("Failed to create {}: {}", parent.display(), e),
                })?;
            }
        }

        let encoded = if self.pretty {
            serde_json::to_string_pretty(snapshot)?
        } else {
            serde_json::to_string(snapshot)?
        };

        // Write then rename so readers never observe a half-written file
        let temp_path = self.temp_path();
        fs::write(&temp_path, encoded).map_err(|e| BalancerError::Storage {
            message: format!("Failed to write {}: {}", temp_path.display(), e),
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| BalancerError::Storage {
            message: format!("Failed to replace {}: {}", self.path.display(), e),
        })?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory storage holding the last saved snapshot
#[derive(Debug, Default)]
pub struct InMemoryRatingStorage {
    snapshot: RwLock<Option<RatingSnapshot>>,
}

impl InMemoryRatingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: RatingSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }

    /// Last saved snapshot, if any
    pub fn current(&self) -> Option<RatingSnapshot> {
        self.snapshot.read().ok().and_then(|s| s.clone())
    }
}

impl RatingStorage for InMemoryRatingStorage {
    fn load_snapshot(&self) -> Result<LoadOutcome> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|_| BalancerError::InternalError {
                message: "Failed to acquire snapshot read lock".to_string(),
            })?;

        Ok(match snapshot.as_ref() {
            Some(snapshot) => LoadOutcome::Loaded(snapshot.clone()),
            None => LoadOutcome::Missing,
        })
    }

    fn save_snapshot(&self, snapshot: &RatingSnapshot) -> Result<()> {
        let mut stored = self
            .snapshot
            .write()
            .map_err(|_| BalancerError::InternalError {
                message: "Failed to acquire snapshot write lock".to_string(),
            })?;

        *stored = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Mock storage for testing: records saves and can be told to fail them
#[derive(Debug, Default)]
pub struct MockRatingStorage {
    initial: RwLock<Option<LoadOutcome>>,
    save_calls: RwLock<Vec<RatingSnapshot>>,
    fail_saves: RwLock<bool>,
}

impl MockRatingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset what the next load returns
    pub fn preset_load(&self, outcome: LoadOutcome) {
        if let Ok(mut initial) = self.initial.write() {
            *initial = Some(outcome);
        }
    }

    /// Make every subsequent save fail
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.write() {
            *flag = fail;
        }
    }

    /// Get all snapshots passed to successful saves (for testing)
    pub fn get_save_calls(&self) -> Vec<RatingSnapshot> {
        self.save_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.save_calls.read().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl RatingStorage for MockRatingStorage {
    fn load_snapshot(&self) -> Result<LoadOutcome> {
        let initial = self
            .initial
            .read()
            .map_err(|_| BalancerError::InternalError {
                message: "Failed to acquire preset read lock".to_string(),
            })?;

        Ok(initial.clone().unwrap_or(LoadOutcome::Missing))
    }

    fn save_snapshot(&self, snapshot: &RatingSnapshot) -> Result<()> {
        let failing = self.fail_saves.read().map(|flag| *flag).unwrap_or(false);
        if failing {
            return Err(BalancerError::Storage {
                message: "simulated save failure".to_string(),
            }
            .into());
        }

        if let Ok(mut calls) = self.save_calls.write() {
            calls.push(snapshot.clone());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
