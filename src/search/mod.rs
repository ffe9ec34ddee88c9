//! Exhaustive search over batting orders.

pub mod coordinator;
pub mod permutations;
pub mod report;

pub use coordinator::{task_seed, PermutationSearchCoordinator};
pub use permutations::{permutation_count, Permutations};
pub use report::{FailedPermutation, FailureKind, LineupCandidate, RunId, SearchReport};
