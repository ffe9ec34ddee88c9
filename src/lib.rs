//! # Lineup Optimizer
//!
//! Estimates a batting lineup's expected run production by Monte Carlo game
//! simulation, then searches every ordering of the roster for the lineup that
//! scores the most.
//!
//! ## Core Concepts
//!
//! - **Hitter**: a player's season counts plus a base-running `pace`
//! - **OutcomeSampler**: turns a hitter's rates into a random at-bat outcome
//! - **BaseState**: the diamond; advances runners, counts outs, keeps score
//! - **SeasonEvaluator**: mean runs per game for one fixed order (its fitness)
//! - **PermutationSearchCoordinator**: evaluates every order in parallel and
//!   keeps the best
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lineup_optimizer::{InMemoryResultSink, PermutationSearchCoordinator, Roster, SearchConfig};
//!
//! let roster = Roster::sample_2021()?;
//! let config = SearchConfig {
//!     games_per_season: 144,
//!     seed: Some(2021),
//!     ..SearchConfig::default()
//! };
//! let sink = Arc::new(InMemoryResultSink::new());
//! let report = PermutationSearchCoordinator::new(roster, config, sink)?.run()?;
//! if let Some(best) = report.best {
//!     println!("{} -> {:.3} runs/game", best.lineup, best.fitness);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

// Simulation core
pub mod diamond;
pub mod roster;
pub mod sampler;
pub mod simulation;

// Search and output
pub mod search;
pub mod storage;

// Ambient
pub mod config;
pub mod error;
pub mod logging;

pub use config::{DoublePlayRule, Horizon, RetryPolicy, SearchConfig};
pub use diamond::{Base, BaseState, Event, Transition};
pub use error::{ConfigurationError, InvariantViolation, LineupError, LineupResult};
pub use roster::{Hitter, HitterBuilder, Roster, LINEUP_DELIMITER};
pub use sampler::{DrawSource, Outcome, OutcomeProbabilities, OutcomeSampler, ScriptedDraws};
pub use search::{FailedPermutation, FailureKind, LineupCandidate, PermutationSearchCoordinator, RunId, SearchReport};
pub use simulation::{GameSimulator, PlayLogEntry, SeasonEvaluator, SeasonSummary};
pub use storage::{FitnessRecord, InMemoryResultSink, ResultReader, ResultSink, SinkError};
