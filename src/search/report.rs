//! Search output.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LineupError;
use crate::storage::UnflushedBatch;

/// Identifier of one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An evaluated batting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupCandidate {
    /// Position of this order in the enumeration.
    pub permutation_index: u64,
    /// Roster indices in batting order.
    pub order: Vec<usize>,
    /// Delimiter-joined player names.
    pub lineup: String,
    /// Mean runs per simulated unit.
    pub fitness: f64,
}

impl LineupCandidate {
    /// Whether `self` should replace `best` in the running reduction.
    ///
    /// Strictly higher fitness wins; equal fitness goes to the order that
    /// comes first in the enumeration, so the result does not depend on which
    /// task finished first.
    #[must_use]
    pub fn beats(&self, best: &Self) -> bool {
        self.fitness > best.fitness
            || (self.fitness == best.fitness && self.permutation_index < best.permutation_index)
    }
}

/// Why a permutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Bad hitter data or settings.
    Configuration,
    /// A base-state transition was refused.
    Invariant,
    /// The evaluation panicked.
    Panic,
    /// Anything else.
    Internal,
}

impl FailureKind {
    /// Classify an evaluation error.
    #[must_use]
    pub const fn of(err: &LineupError) -> Self {
        match err {
            LineupError::Configuration(_) => Self::Configuration,
            LineupError::Invariant(_) => Self::Invariant,
            LineupError::Sink(_)
            | LineupError::WorkerTaskFailure { .. }
            | LineupError::SinkWriteFailure { .. }
            | LineupError::Internal { .. } => Self::Internal,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configuration => "configuration",
            Self::Invariant => "invariant",
            Self::Panic => "panic",
            Self::Internal => "internal",
        })
    }
}

/// A permutation whose evaluation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPermutation {
    /// Position of this order in the enumeration.
    pub permutation_index: u64,
    /// Delimiter-joined player names.
    pub lineup: String,
    /// Category of the failure.
    pub kind: FailureKind,
    /// What went wrong.
    pub cause: String,
}

/// Final report of a search.
///
/// `succeeded + failed.len() == dispatched` and
/// `dispatched + skipped == total_permutations` always hold.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Base seed every per-lineup draw stream was derived from.
    pub seed: u64,
    /// Orderings of the roster.
    pub total_permutations: u64,
    /// Orderings handed to workers.
    pub dispatched: u64,
    /// Orderings evaluated successfully.
    pub succeeded: u64,
    /// Orderings whose evaluation failed.
    pub failed: Vec<FailedPermutation>,
    /// Permutations never dispatched because the budget ran out.
    pub skipped: u64,
    /// Highest-fitness ordering, if any succeeded.
    pub best: Option<LineupCandidate>,
    /// Sink batches that could not be written even after retries.
    pub unflushed: Vec<UnflushedBatch>,
    /// Wall-clock time of the search.
    pub elapsed: Duration,
}

impl SearchReport {
    /// True if every dispatched permutation succeeded and reached the sink.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unflushed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(idx: u64, fitness: f64) -> LineupCandidate {
        LineupCandidate {
            permutation_index: idx,
            order: vec![],
            lineup: String::new(),
            fitness,
        }
    }

    #[test]
    fn higher_fitness_wins() {
        assert!(candidate(5, 4.1).beats(&candidate(0, 4.0)));
        assert!(!candidate(0, 3.9).beats(&candidate(5, 4.0)));
    }

    #[test]
    fn ties_go_to_the_earlier_permutation() {
        assert!(candidate(1, 4.0).beats(&candidate(3, 4.0)));
        assert!(!candidate(3, 4.0).beats(&candidate(1, 4.0)));
        assert!(!candidate(3, 4.0).beats(&candidate(3, 4.0)));
    }

    #[test]
    fn failure_kind_follows_the_error_layer() {
        use crate::error::{ConfigurationError, InvariantViolation};

        assert_eq!(
            FailureKind::of(&ConfigurationError::EmptyRoster.into()),
            FailureKind::Configuration
        );
        assert_eq!(
            FailureKind::of(&InvariantViolation::HalfInningOver.into()),
            FailureKind::Invariant
        );
        assert_eq!(FailureKind::of(&LineupError::internal("x")), FailureKind::Internal);
        assert_eq!(FailureKind::Panic.to_string(), "panic");
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
