use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MatchEngineError, Result};

/// Matching engine configuration
///
/// Scoring weights and thresholds are deliberately absent: they are fixed
/// behavioral constants of [`crate::scoring`]. Everything here is operational.
///
/// # Examples
///
/// ```
/// use staffline_match_engine::EngineConfig;
///
/// let mut config = EngineConfig::default();
/// assert_eq!(config.ranking.default_limit, 5);
/// assert_eq!(config.assignment.attempt_timeout_ms, 250);
///
/// config.queue.max_size = 0;
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranking defaults
    pub ranking: RankingConfig,

    /// Assignment coordinator behavior
    pub assignment: AssignmentConfig,

    /// Waiting queue for live requests nobody could take yet
    pub queue: QueueConfig,

    /// Transition event broadcasting
    pub events: EventConfig,

    /// Optional SQLite persistence for profiles
    pub database: DatabaseConfig,
}

/// Ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Number of matches returned when the caller does not pass a limit
    pub default_limit: usize,
}

/// Assignment coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    /// Upper bound on a single reservation attempt, in milliseconds
    ///
    /// An attempt that does not finish in time is treated like a lost race and
    /// the coordinator moves on to the next candidate.
    pub attempt_timeout_ms: u64,
}

/// Waiting queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of waiting live requests
    pub max_size: usize,

    /// How long a live request may wait before it is expired
    pub max_wait_seconds: u64,
}

/// Event hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Capacity of the broadcast channel
    pub broadcast_capacity: usize,

    /// Number of events retained in history
    pub max_history: usize,
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite:staffline.db` or `sqlite::memory:`
    ///
    /// `None` keeps profiles in process memory.
    pub url: Option<String>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { default_limit: 5 }
    }
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self { attempt_timeout_ms: 250 }
    }
}

impl AssignmentConfig {
    /// Attempt timeout as a [`Duration`]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_wait_seconds: 900,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1024,
            max_history: 1000,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values
    ///
    /// # Validation Rules
    ///
    /// - Ranking limit, attempt timeout, queue size and wait time must be non-zero
    /// - Broadcast capacity must be non-zero
    /// - A configured database URL must be a `sqlite:` URL
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.ranking.default_limit == 0 {
            return Err("ranking.default_limit must be greater than 0".to_string());
        }

        if self.assignment.attempt_timeout_ms == 0 {
            return Err("assignment.attempt_timeout_ms must be greater than 0".to_string());
        }

        if self.assignment.attempt_timeout_ms > 10_000 {
            return Err("assignment.attempt_timeout_ms cannot exceed 10000ms".to_string());
        }

        if self.queue.max_size == 0 {
            return Err("queue.max_size must be greater than 0".to_string());
        }

        if self.queue.max_wait_seconds == 0 {
            return Err("queue.max_wait_seconds must be greater than 0".to_string());
        }

        if self.events.broadcast_capacity == 0 {
            return Err("events.broadcast_capacity must be greater than 0".to_string());
        }

        if let Some(url) = &self.database.url {
            if !url.starts_with("sqlite:") {
                return Err(format!("database.url must be a sqlite URL, got {}", url));
            }
        }

        Ok(())
    }

    /// Load a JSON configuration file and validate it
    ///
    /// Missing sections fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MatchEngineError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse a JSON configuration document and validate it
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(raw)
            .map_err(|e| MatchEngineError::configuration(e.to_string()))?;
        config.validate().map_err(MatchEngineError::Configuration)?;
        Ok(config)
    }
}
