//! Base-occupancy state machine.
//!
//! `BaseState` tracks who is on which base, the out count, and runs scored.
//! Every event goes through [`BaseState::apply`], which mutates the owned
//! state and reports what happened as a [`Transition`]. The third out fires
//! the half-inning-end transition: bases are emptied and outs zeroed in one
//! step, and the state refuses further events until
//! [`BaseState::begin_half_inning`] is called. Score carries across
//! half-innings.

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::roster::Hitter;
use crate::sampler::{DrawSource, Outcome};

/// Outs that end a half-inning.
pub const OUTS_PER_HALF_INNING: u8 = 3;

/// The three bases, in running order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Base {
    First,
    Second,
    Third,
}

impl Base {
    /// All bases in running order.
    pub const ALL: [Self; 3] = [Self::First, Self::Second, Self::Third];

    const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
        }
    }
}

/// Anything that can be applied to a `BaseState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Single,
    Double,
    Triple,
    HomeRun,
    Walk,
    HitByPitch,
    Out,
    /// Batter and the forced runner(s) from first are retired together.
    DoublePlay,
}

impl From<Outcome> for Event {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Single => Self::Single,
            Outcome::Double => Self::Double,
            Outcome::Triple => Self::Triple,
            Outcome::HomeRun => Self::HomeRun,
            Outcome::Walk => Self::Walk,
            Outcome::HitByPitch => Self::HitByPitch,
            Outcome::Out => Self::Out,
        }
    }
}

/// Observable effect of one applied event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Runs that crossed the plate.
    pub runs: u32,
    /// Outs recorded by this event (0, 1 or 2).
    pub outs_recorded: u8,
    /// True when this event produced the third out.
    pub half_inning_ended: bool,
}

/// Runner occupancy, outs and score for one simulation unit.
///
/// Runners are borrowed from the roster; the state never outlives the lineup
/// it was driven with.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseState<'a> {
    bases: [Option<&'a Hitter>; 3],
    outs: u8,
    score: u32,
    half_inning_over: bool,
}

impl Default for BaseState<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BaseState<'a> {
    /// Empty bases, no outs, no runs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bases: [None, None, None],
            outs: 0,
            score: 0,
            half_inning_over: false,
        }
    }

    /// Runner currently on `base`.
    #[must_use]
    pub const fn runner(&self, base: Base) -> Option<&'a Hitter> {
        self.bases[base.index()]
    }

    /// Whether `base` is occupied.
    #[must_use]
    pub const fn is_occupied(&self, base: Base) -> bool {
        self.bases[base.index()].is_some()
    }

    /// Number of occupied bases.
    #[must_use]
    pub fn occupied_count(&self) -> u32 {
        self.bases.iter().map(|b| u32::from(b.is_some())).sum()
    }

    /// Outs in the current half-inning.
    #[must_use]
    pub const fn outs(&self) -> u8 {
        self.outs
    }

    /// Runs scored since construction.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// True between the third out and the next `begin_half_inning`.
    #[must_use]
    pub const fn is_half_inning_over(&self) -> bool {
        self.half_inning_over
    }

    /// Whether a double play may be applied right now.
    #[must_use]
    pub const fn double_play_permitted(&self) -> bool {
        !self.half_inning_over && self.outs < 2 && self.bases[0].is_some()
    }

    /// Reopen the state for the next half-inning, keeping the score.
    pub fn begin_half_inning(&mut self) {
        self.bases = [None, None, None];
        self.outs = 0;
        self.half_inning_over = false;
    }

    /// Apply one event with `batter` at the plate.
    ///
    /// `draws` supplies pace rolls for runners who may take an extra base.
    ///
    /// # Errors
    /// - `HalfInningOver` if the third out was already recorded
    /// - `OutsOutOfRange` if the out counter is corrupt
    /// - `DoublePlayNotPermitted` for a double play without a runner on first
    ///   or with two outs
    pub fn apply(
        &mut self,
        event: Event,
        batter: &'a Hitter,
        draws: &mut impl DrawSource,
    ) -> Result<Transition, InvariantViolation> {
        if self.half_inning_over {
            return Err(InvariantViolation::HalfInningOver);
        }
        if self.outs >= OUTS_PER_HALF_INNING {
            return Err(InvariantViolation::OutsOutOfRange { outs: self.outs });
        }

        let mut transition = Transition::default();
        match event {
            Event::Single => transition.runs = self.hit(1, batter, draws),
            Event::Double => transition.runs = self.hit(2, batter, draws),
            Event::Triple => transition.runs = self.hit(3, batter, draws),
            Event::HomeRun => {
                transition.runs = 1 + self.occupied_count();
                self.bases = [None, None, None];
            }
            Event::Walk | Event::HitByPitch => transition.runs = self.force_batter_to_first(batter),
            Event::Out => {
                self.outs += 1;
                transition.outs_recorded = 1;
            }
            Event::DoublePlay => {
                if !self.double_play_permitted() {
                    return Err(InvariantViolation::DoublePlayNotPermitted {
                        outs: self.outs,
                        runner_on_first: self.bases[0].is_some(),
                    });
                }
                // The runner on second is forced only when first is occupied,
                // which a double play requires.
                self.bases[0] = None;
                self.bases[1] = None;
                self.outs += 2;
                transition.outs_recorded = 2;
            }
        }

        self.score += transition.runs;
        if self.outs >= OUTS_PER_HALF_INNING {
            self.end_half_inning();
            transition.half_inning_ended = true;
        }
        Ok(transition)
    }

    fn end_half_inning(&mut self) {
        self.bases = [None, None, None];
        self.outs = 0;
        self.half_inning_over = true;
    }

    /// Advance every runner `bases_taken` bases, nearest home first. A runner
    /// who wins a pace roll takes one more base if it is free. The batter ends
    /// on the base matching the hit.
    fn hit(&mut self, bases_taken: usize, batter: &'a Hitter, draws: &mut impl DrawSource) -> u32 {
        let mut runs = 0;
        let mut next: [Option<&'a Hitter>; 3] = [None, None, None];

        for from in (0..3).rev() {
            let Some(runner) = self.bases[from].take() else {
                continue;
            };
            let dest = from + bases_taken;
            if dest >= 3 {
                runs += 1;
                continue;
            }

            let extra = dest + 1;
            let extra_free = extra >= 3 || next[extra].is_none();
            if extra_free && draws.next_draw() < runner.pace {
                if extra >= 3 {
                    runs += 1;
                } else {
                    next[extra] = Some(runner);
                }
            } else {
                next[dest] = Some(runner);
            }
        }

        next[bases_taken - 1] = Some(batter);
        self.bases = next;
        runs
    }

    /// Walk / hit-by-pitch: only forced runners move.
    fn force_batter_to_first(&mut self, batter: &'a Hitter) -> u32 {
        let [first, second, third] = self.bases;
        match (first, second, third) {
            (None, _, _) => {
                self.bases[0] = Some(batter);
                0
            }
            (Some(_), None, _) => {
                self.bases = [Some(batter), first, third];
                0
            }
            (Some(_), Some(_), None) => {
                self.bases = [Some(batter), first, second];
                0
            }
            (Some(_), Some(_), Some(_)) => {
                self.bases = [Some(batter), first, second];
                1
            }
        }
    }
}
