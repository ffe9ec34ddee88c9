//! Search configuration.
//!
//! `SearchConfig` is passed explicitly into the coordinator at construction.
//! Every field has a default, so a partial JSON file is a valid config.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diamond::OUTS_PER_HALF_INNING;
use crate::error::ConfigurationError;

/// Default games simulated per lineup.
pub const DEFAULT_GAMES_PER_SEASON: u32 = 144;

/// Default outs in a full game (nine three-out half-innings).
pub const DEFAULT_OUTS_PER_GAME: u32 = 27;

/// The unit one simulation runs before halting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Horizon {
    /// A single half-inning: halts on the third out.
    HalfInning,
    /// A full game: halts after `outs` total outs.
    Game {
        /// Total outs; a positive multiple of three.
        outs: u32,
    },
}

impl Horizon {
    /// Nine innings.
    pub const FULL_GAME: Self = Self::Game {
        outs: DEFAULT_OUTS_PER_GAME,
    };

    /// Total outs before the simulation halts.
    #[must_use]
    pub const fn total_outs(self) -> u32 {
        match self {
            Self::HalfInning => OUTS_PER_HALF_INNING as u32,
            Self::Game { outs } => outs,
        }
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self::FULL_GAME
    }
}

/// Optional double-play rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublePlayRule {
    /// Off by default.
    pub enabled: bool,
    /// Chance that an eligible out becomes a double play.
    pub rate: f64,
}

impl Default for DoublePlayRule {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 1.0,
        }
    }
}

impl DoublePlayRule {
    /// Rule that turns every eligible out into a double play.
    #[must_use]
    pub const fn always() -> Self {
        Self {
            enabled: true,
            rate: 1.0,
        }
    }
}

/// Retry schedule for sink writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Linear backoff step between attempts.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 25,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (1-based; the first attempt has none).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt.saturating_sub(1))))
    }
}

/// Everything the permutation search needs besides the roster and the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Games simulated per lineup.
    pub games_per_season: u32,
    /// Halting condition of one simulated unit.
    pub horizon: Horizon,
    /// Number of worker threads.
    pub worker_pool_size: usize,
    /// Maximum queued permutations awaiting a worker.
    pub queue_capacity: usize,
    /// Double-play rule.
    pub double_play: DoublePlayRule,
    /// Base seed. `None` picks one at random; the chosen seed is reported.
    pub seed: Option<u64>,
    /// Stop dispatching after this many permutations.
    pub max_permutations: Option<u64>,
    /// Capture play-by-play logs and hand them to the sink.
    pub record_play_logs: bool,
    /// Sink write retries.
    pub sink_retry: RetryPolicy,
}

/// Available parallel execution units, at least one.
#[must_use]
pub fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            games_per_season: DEFAULT_GAMES_PER_SEASON,
            horizon: Horizon::default(),
            worker_pool_size: default_worker_pool_size(),
            queue_capacity: 1024,
            double_play: DoublePlayRule::default(),
            seed: None,
            max_permutations: None,
            record_play_logs: false,
            sink_retry: RetryPolicy::default(),
        }
    }
}

impl SearchConfig {
    /// Validate and return the config.
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if self.games_per_season == 0 {
            return Err(ConfigurationError::invalid("games_per_season must be > 0"));
        }
        if let Horizon::Game { outs } = self.horizon {
            let per = u32::from(OUTS_PER_HALF_INNING);
            if outs == 0 || outs % per != 0 {
                return Err(ConfigurationError::invalid(format!(
                    "outs_per_game must be a positive multiple of {per} (got {outs})"
                )));
            }
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigurationError::invalid("worker_pool_size must be > 0"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigurationError::invalid("queue_capacity must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.double_play.rate) {
            return Err(ConfigurationError::invalid(format!(
                "double_play.rate must be within [0.0, 1.0] (got {})",
                self.double_play.rate
            )));
        }
        if self.sink_retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid("sink_retry.max_attempts must be > 0"));
        }
        Ok(self)
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigurationError::Parse {
            message: format!("config: {e}"),
        })?;
        cfg.validate()
    }

    /// Load a config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Parse {
            message: format!("failed to read config {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }
}
