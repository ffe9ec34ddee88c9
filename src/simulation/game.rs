//! Game and half-inning simulation.
//!
//! A `GameSimulator` walks a circular batting order, sampling one outcome per
//! plate appearance and applying it to a single `BaseState`, until the
//! configured out horizon is reached.

use serde::{Deserialize, Serialize};

use crate::config::{DoublePlayRule, Horizon, SearchConfig};
use crate::diamond::{BaseState, Event, OUTS_PER_HALF_INNING};
use crate::error::{ConfigurationError, InvariantViolation};
use crate::roster::Hitter;
use crate::sampler::{DrawSource, Outcome, OutcomeSampler};

/// Below this out probability a hitter is treated as unable to make outs.
const MIN_OUT_PROBABILITY: f64 = 1e-12;

/// One row of the play-by-play log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayLogEntry {
    pub game_id: u64,
    /// 1-based half-inning within the game.
    pub inning: u32,
    /// 1-based plate appearance within the game.
    pub at_bat_number: u32,
    pub batter: String,
    pub event: Outcome,
    /// Running score after the play.
    pub score: u32,
}

/// Receives play-log entries in at-bat order.
pub trait PlayRecorder {
    /// Whether entries should be built at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Record one entry.
    fn record(&mut self, entry: PlayLogEntry);
}

impl PlayRecorder for Vec<PlayLogEntry> {
    fn record(&mut self, entry: PlayLogEntry) {
        self.push(entry);
    }
}

/// Recorder that drops everything without building entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlayLog;

impl PlayRecorder for NoPlayLog {
    fn enabled(&self) -> bool {
        false
    }

    fn record(&mut self, _entry: PlayLogEntry) {}
}

/// A batting order with a validated sampler per slot.
#[derive(Debug, Clone)]
pub struct BattingOrder<'a> {
    slots: Vec<(&'a Hitter, OutcomeSampler)>,
}

impl<'a> BattingOrder<'a> {
    /// Validate every hitter's rates and build the order.
    ///
    /// # Errors
    /// - `EmptyRoster` for an empty order
    /// - any rate error from [`OutcomeSampler::new`], naming the hitter
    /// - `InvalidSearchConfig` if no hitter in the order can make an out
    pub fn new(hitters: &[&'a Hitter]) -> Result<Self, ConfigurationError> {
        if hitters.is_empty() {
            return Err(ConfigurationError::EmptyRoster);
        }
        let slots = hitters
            .iter()
            .map(|&h| OutcomeSampler::new(h).map(|s| (h, s)))
            .collect::<Result<Vec<_>, _>>()?;

        if slots
            .iter()
            .all(|(_, s)| s.probabilities().out() < MIN_OUT_PROBABILITY)
        {
            return Err(ConfigurationError::invalid(
                "no hitter in the batting order can make an out",
            ));
        }

        Ok(Self { slots })
    }

    /// Number of batting slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Never true for a constructed order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, pointer: usize) -> (&'a Hitter, &OutcomeSampler) {
        let (h, s) = &self.slots[pointer % self.slots.len()];
        (*h, s)
    }
}

/// Drives one simulation unit (half-inning or game).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSimulator {
    horizon: Horizon,
    double_play: DoublePlayRule,
}

impl Default for GameSimulator {
    fn default() -> Self {
        Self::new(Horizon::default(), DoublePlayRule::default())
    }
}

impl GameSimulator {
    /// Create a simulator.
    #[must_use]
    pub const fn new(horizon: Horizon, double_play: DoublePlayRule) -> Self {
        Self {
            horizon,
            double_play,
        }
    }

    /// Create a simulator from the game rules in a search config.
    #[must_use]
    pub const fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.horizon, config.double_play)
    }

    /// The halting horizon.
    #[must_use]
    pub const fn horizon(&self) -> Horizon {
        self.horizon
    }

    /// Simulate one unit and return its final score.
    ///
    /// The batting-order pointer starts at the leadoff slot and wraps modulo
    /// the order length; it is never reset inside the unit.
    pub fn play<'a>(
        &self,
        order: &BattingOrder<'a>,
        game_id: u64,
        draws: &mut impl DrawSource,
        log: &mut impl PlayRecorder,
    ) -> Result<u32, InvariantViolation> {
        let total_outs = self.horizon.total_outs();
        let per_half = u32::from(OUTS_PER_HALF_INNING);

        let mut state = BaseState::new();
        let mut outs = 0u32;
        let mut pointer = 0usize;
        let mut at_bat_number = 0u32;

        while outs < total_outs {
            if state.is_half_inning_over() {
                state.begin_half_inning();
            }

            let (batter, sampler) = order.slot(pointer);
            let outcome = sampler.sample(draws);
            let event = self.resolve_event(outcome, &state, draws);
            let inning = outs / per_half + 1;

            let transition = state.apply(event, batter, draws)?;
            outs += u32::from(transition.outs_recorded);
            at_bat_number += 1;

            if log.enabled() {
                log.record(PlayLogEntry {
                    game_id,
                    inning,
                    at_bat_number,
                    batter: batter.name.clone(),
                    event: outcome,
                    score: state.score(),
                });
            }

            pointer = (pointer + 1) % order.len();
        }

        Ok(state.score())
    }

    /// Turn a sampled outcome into the event applied to the bases.
    fn resolve_event(&self, outcome: Outcome, state: &BaseState<'_>, draws: &mut impl DrawSource) -> Event {
        let rule = self.double_play;
        if outcome != Outcome::Out || !rule.enabled || !state.double_play_permitted() {
            return Event::from(outcome);
        }

        let converts = if rule.rate >= 1.0 {
            true
        } else if rule.rate <= 0.0 {
            false
        } else {
            draws.next_draw() < rule.rate
        };

        if converts {
            Event::DoublePlay
        } else {
            Event::Out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ScriptedDraws;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Singles on draws below 0.5, outs otherwise.
    fn half_single(name: &str, pace: f64) -> Hitter {
        Hitter::builder(name)
            .plate_appearances(100)
            .at_bats(100)
            .hits(50)
            .pace(pace)
            .build()
    }

    fn always_out(name: &str) -> Hitter {
        Hitter::builder(name).plate_appearances(100).at_bats(100).build()
    }

    #[test]
    fn all_out_game_has_27_plate_appearances_and_no_runs() {
        let hitters: Vec<Hitter> = (0..9).map(|i| always_out(&format!("h{i}"))).collect();
        let refs: Vec<&Hitter> = hitters.iter().collect();
        let order = BattingOrder::new(&refs).unwrap();
        let mut log = Vec::new();
        let mut rng = SmallRng::seed_from_u64(1);

        let score = GameSimulator::default().play(&order, 7, &mut rng, &mut log).unwrap();
        assert_eq!(score, 0);
        assert_eq!(log.len(), 27);
        assert_eq!(log[0].inning, 1);
        assert_eq!(log[26].inning, 9);
        assert_eq!(log[26].at_bat_number, 27);
        assert!(log.iter().all(|e| e.game_id == 7 && e.event == Outcome::Out));
        // Pointer wraps: the tenth batter is the leadoff hitter again.
        assert_eq!(log[9].batter, "h0");
    }

    #[test]
    fn half_inning_of_three_full_pace_singles_scores_one() {
        let fast = half_single("fast", 1.0);
        let order = BattingOrder::new(&[&fast]).unwrap();
        // single, single, pace roll, single, pace roll, then three outs
        let mut draws = ScriptedDraws::new(vec![0.1, 0.1, 0.0, 0.1, 0.0, 0.9, 0.9, 0.9]);
        let mut log = Vec::new();

        let sim = GameSimulator::new(Horizon::HalfInning, DoublePlayRule::default());
        let score = sim.play(&order, 1, &mut draws, &mut log).unwrap();

        assert_eq!(score, 1);
        let events: Vec<_> = log.iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            [Outcome::Single, Outcome::Single, Outcome::Single, Outcome::Out, Outcome::Out, Outcome::Out]
        );
        let scores: Vec<_> = log.iter().map(|e| e.score).collect();
        assert_eq!(scores, [0, 0, 1, 1, 1, 1]);
        assert_eq!(draws.consumed(), 8);
    }

    #[test]
    fn identical_draws_replay_identically() {
        let roster = crate::roster::Roster::sample_2021().unwrap();
        let refs: Vec<&Hitter> = roster.hitters().iter().collect();
        let order = BattingOrder::new(&refs).unwrap();
        let sim = GameSimulator::default();

        let mut log_a = Vec::new();
        let mut log_b = Vec::new();
        let a = sim.play(&order, 3, &mut SmallRng::seed_from_u64(99), &mut log_a).unwrap();
        let b = sim.play(&order, 3, &mut SmallRng::seed_from_u64(99), &mut log_b).unwrap();

        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&log_a).unwrap(),
            serde_json::to_vec(&log_b).unwrap()
        );
    }

    #[test]
    fn play_log_is_strictly_sequenced() {
        let roster = crate::roster::Roster::sample_2021().unwrap();
        let refs: Vec<&Hitter> = roster.hitters().iter().collect();
        let order = BattingOrder::new(&refs).unwrap();
        let mut log = Vec::new();
        GameSimulator::default()
            .play(&order, 0, &mut SmallRng::seed_from_u64(5), &mut log)
            .unwrap();

        for (i, e) in log.iter().enumerate() {
            assert_eq!(e.at_bat_number as usize, i + 1);
        }
        assert!(log.windows(2).all(|w| w[0].score <= w[1].score && w[0].inning <= w[1].inning));
        assert_eq!(log.iter().filter(|e| e.event == Outcome::Out).count(), 27);
    }

    #[test]
    fn double_play_rule_converts_eligible_outs() {
        // walk on draws below 0.5, out otherwise
        let walker = Hitter::builder("walker")
            .plate_appearances(100)
            .at_bats(100)
            .walks(50)
            .build();
        let order = BattingOrder::new(&[&walker]).unwrap();
        let sim = GameSimulator::new(Horizon::HalfInning, DoublePlayRule::always());
        // walk, then out -> double play (2 outs), then out -> third out
        let mut draws = ScriptedDraws::new(vec![0.1, 0.9, 0.9]);
        let mut log = Vec::new();
        sim.play(&order, 0, &mut draws, &mut log).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(draws.consumed(), 3);
    }

    #[test]
    fn order_rejects_bad_hitter_by_name() {
        let ok = always_out("ok");
        let bad = Hitter::builder("bad").plate_appearances(10).build();
        let err = BattingOrder::new(&[&ok, &bad]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ZeroDenominator {
                hitter: "bad".to_string(),
                field: "at_bats"
            }
        );
    }

    #[test]
    fn order_rejects_lineup_that_cannot_make_outs() {
        let perfect = Hitter::builder("perfect")
            .plate_appearances(10)
            .at_bats(10)
            .hits(10)
            .build();
        assert!(matches!(
            BattingOrder::new(&[&perfect]),
            Err(ConfigurationError::InvalidSearchConfig { .. })
        ));
    }

    #[test]
    fn no_play_log_skips_entries() {
        let h = always_out("h");
        let order = BattingOrder::new(&[&h]).unwrap();
        let score = GameSimulator::default()
            .play(&order, 0, &mut SmallRng::seed_from_u64(1), &mut NoPlayLog)
            .unwrap();
        assert_eq!(score, 0);
    }
}
