//! Season evaluation: the fitness of one fixed batting order.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SearchConfig;
use crate::error::LineupResult;
use crate::roster::Hitter;
use crate::sampler::DrawSource;

use super::game::{BattingOrder, GameSimulator, PlayRecorder};

/// Aggregate of one simulated season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    /// Mean runs per simulated unit.
    pub fitness: f64,
    /// Units simulated.
    pub games: u32,
    /// Runs over the whole season.
    pub total_runs: u64,
    /// Best single unit.
    pub max_runs: u32,
}

/// Runs `games_per_season` simulations of one order and averages the scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonEvaluator {
    simulator: GameSimulator,
    games_per_season: u32,
}

impl SeasonEvaluator {
    /// Create an evaluator. `games_per_season` is clamped to at least one.
    #[must_use]
    pub fn new(simulator: GameSimulator, games_per_season: u32) -> Self {
        Self {
            simulator,
            games_per_season: games_per_season.max(1),
        }
    }

    /// Create an evaluator from a search config.
    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(GameSimulator::from_config(config), config.games_per_season)
    }

    /// Games simulated per evaluation.
    #[must_use]
    pub const fn games_per_season(&self) -> u32 {
        self.games_per_season
    }

    /// Evaluate one batting order.
    ///
    /// Every game starts from a fresh `BaseState`; `draws` continues across
    /// games so they are independent. Game ids run from `first_game_id`.
    ///
    /// # Errors
    /// Configuration errors for hitters with undefined rates and invariant
    /// violations raised by the base state.
    pub fn evaluate(
        &self,
        order: &[&Hitter],
        first_game_id: u64,
        draws: &mut impl DrawSource,
        log: &mut impl PlayRecorder,
    ) -> LineupResult<SeasonSummary> {
        let order = BattingOrder::new(order)?;

        let mut total_runs = 0u64;
        let mut max_runs = 0u32;
        for game in 0..self.games_per_season {
            let game_id = first_game_id + u64::from(game);
            let runs = self.simulator.play(&order, game_id, draws, log)?;
            trace!(game_id, runs, "game simulated");
            total_runs += u64::from(runs);
            max_runs = max_runs.max(runs);
        }

        #[allow(clippy::cast_precision_loss)]
        let fitness = total_runs as f64 / f64::from(self.games_per_season);

        Ok(SeasonSummary {
            fitness,
            games: self.games_per_season,
            total_runs,
            max_runs,
        })
    }
}
