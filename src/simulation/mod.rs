//! Monte Carlo simulation of games and seasons for one batting order.
//!
//! Everything here is single-threaded, CPU-bound and never blocks; the search
//! coordinator runs one season per worker task.

pub mod game;
pub mod season;

pub use game::{BattingOrder, GameSimulator, NoPlayLog, PlayLogEntry, PlayRecorder};
pub use season::{SeasonEvaluator, SeasonSummary};
