//! At-bat outcome sampling.
//!
//! Six outcome probabilities are derived from a hitter's counting stats in a
//! fixed order (single, double, triple, home run, walk, hit-by-pitch). The
//! residual mass is the out. A single uniform draw picks the first category
//! whose cumulative threshold exceeds it.

use std::fmt;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::roster::Hitter;

/// Slack allowed when the six probabilities sum to slightly above 1.0 through
/// floating-point rounding.
const PROBABILITY_EPSILON: f64 = 1e-9;

/// The result of one plate appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Single,
    Double,
    Triple,
    HomeRun,
    Walk,
    HitByPitch,
    Out,
}

impl Outcome {
    /// Sampled categories in threshold order. `Out` is the fallthrough.
    pub const SAMPLED: [Self; 6] = [
        Self::Single,
        Self::Double,
        Self::Triple,
        Self::HomeRun,
        Self::Walk,
        Self::HitByPitch,
    ];

    /// Stable lowercase name, matching the play-log `event` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::HomeRun => "home_run",
            Self::Walk => "walk",
            Self::HitByPitch => "hit_by_pitch",
            Self::Out => "out",
        }
    }

    /// True for singles, doubles, triples and home runs.
    #[must_use]
    pub const fn is_hit(self) -> bool {
        matches!(self, Self::Single | Self::Double | Self::Triple | Self::HomeRun)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source of uniform draws in `[0, 1)`.
///
/// Every `rand` generator is a draw source. `ScriptedDraws` replays a fixed
/// sequence so that outcomes and pace rolls are reproducible under test.
pub trait DrawSource {
    /// Next uniform value in `[0, 1)`.
    fn next_draw(&mut self) -> f64;
}

impl<R: RngCore> DrawSource for R {
    fn next_draw(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of draws, wrapping around when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedDraws {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedDraws {
    /// Create a replay source. An empty script always yields `0.0`.
    #[must_use]
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }

    /// Number of draws handed out so far.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.cursor
    }
}

impl DrawSource for ScriptedDraws {
    fn next_draw(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}

/// Per-category probabilities for one hitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub single: f64,
    pub double: f64,
    pub triple: f64,
    pub home_run: f64,
    pub walk: f64,
    pub hit_by_pitch: f64,
}

impl OutcomeProbabilities {
    /// Derive probabilities from a hitter's counts.
    ///
    /// # Errors
    /// - `ZeroDenominator` when at-bats or plate appearances are zero
    /// - `NegativeCount` when extra-base hits exceed total hits
    /// - `PaceOutOfRange` when pace is not a probability
    /// - `ProbabilityOverflow` when the six rates sum above 1.0
    pub fn from_hitter(hitter: &Hitter) -> Result<Self, ConfigurationError> {
        if hitter.at_bats == 0 {
            return Err(ConfigurationError::ZeroDenominator {
                hitter: hitter.name.clone(),
                field: "at_bats",
            });
        }
        if hitter.plate_appearances == 0 {
            return Err(ConfigurationError::ZeroDenominator {
                hitter: hitter.name.clone(),
                field: "plate_appearances",
            });
        }
        if !(0.0..=1.0).contains(&hitter.pace) {
            return Err(ConfigurationError::PaceOutOfRange {
                hitter: hitter.name.clone(),
                pace: hitter.pace,
            });
        }

        let extra_base = u64::from(hitter.doubles) + u64::from(hitter.triples) + u64::from(hitter.home_runs);
        let singles = u64::from(hitter.hits).checked_sub(extra_base).ok_or_else(|| {
            ConfigurationError::NegativeCount {
                hitter: hitter.name.clone(),
                field: "singles",
            }
        })?;

        let ab = f64::from(hitter.at_bats);
        let pa = f64::from(hitter.plate_appearances);

        #[allow(clippy::cast_precision_loss)]
        let probs = Self {
            single: singles as f64 / ab,
            double: f64::from(hitter.doubles) / ab,
            triple: f64::from(hitter.triples) / ab,
            home_run: f64::from(hitter.home_runs) / ab,
            walk: f64::from(hitter.walks) / pa,
            hit_by_pitch: f64::from(hitter.hit_by_pitch) / pa,
        };

        let total = probs.total();
        if total > 1.0 + PROBABILITY_EPSILON {
            return Err(ConfigurationError::ProbabilityOverflow {
                hitter: hitter.name.clone(),
                total,
            });
        }

        Ok(probs)
    }

    /// Probabilities in sampling order.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 6] {
        [
            self.single,
            self.double,
            self.triple,
            self.home_run,
            self.walk,
            self.hit_by_pitch,
        ]
    }

    /// Sum of the six non-out categories.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Residual probability of an out.
    #[must_use]
    pub fn out(&self) -> f64 {
        // Only rounding slack can push this below zero; overflow is rejected above.
        (1.0 - self.total()).max(0.0)
    }
}

/// Draws outcomes for one hitter using precomputed cumulative thresholds.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeSampler {
    probabilities: OutcomeProbabilities,
    thresholds: [f64; 6],
}

impl OutcomeSampler {
    /// Build a sampler, validating the hitter's rates.
    pub fn new(hitter: &Hitter) -> Result<Self, ConfigurationError> {
        let probabilities = OutcomeProbabilities::from_hitter(hitter)?;
        let mut thresholds = [0.0; 6];
        let mut acc = 0.0;
        for (slot, p) in thresholds.iter_mut().zip(probabilities.as_array()) {
            acc += p;
            *slot = acc;
        }
        Ok(Self {
            probabilities,
            thresholds,
        })
    }

    /// The probabilities backing this sampler.
    #[must_use]
    pub const fn probabilities(&self) -> &OutcomeProbabilities {
        &self.probabilities
    }

    /// Map a uniform value to an outcome.
    #[must_use]
    pub fn outcome_for(&self, u: f64) -> Outcome {
        self.thresholds
            .iter()
            .zip(Outcome::SAMPLED)
            .find_map(|(&t, outcome)| (u < t).then_some(outcome))
            .unwrap_or(Outcome::Out)
    }

    /// Consume one draw and return the outcome.
    pub fn sample(&self, draws: &mut impl DrawSource) -> Outcome {
        self.outcome_for(draws.next_draw())
    }
}
