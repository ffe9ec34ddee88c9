//! Abstract result-sink traits.
//!
//! The search core needs only two writes from its sink: one fitness result per
//! lineup and batches of play-log rows. Reads are a separate trait so that
//! write-only sinks are possible.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::PlayLogEntry;

/// Errors that can occur inside a sink backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The backend cannot accept writes right now. Worth retrying.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Backend error.
    #[error("Sink backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SinkError {
    /// Returns true if the same write may succeed later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// One row of the `results` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessRecord {
    /// Player names in batting order, delimiter-joined.
    pub lineup: String,
    /// Mean runs per simulated game.
    pub average_score: f64,
}

/// Append-only destination for search output.
///
/// Implementations must tolerate concurrent callers; the search itself funnels
/// every write through a single writer thread.
pub trait ResultSink: Send + Sync {
    /// Append one lineup result.
    fn append_result(&self, record: &FitnessRecord) -> Result<(), SinkError>;

    /// Append a batch of play-log rows, preserving their order.
    fn append_play_logs(&self, entries: &[PlayLogEntry]) -> Result<(), SinkError>;
}

/// Query access to stored results.
pub trait ResultReader: Send + Sync {
    /// The `n` best results by average score, descending. Ties are ordered by
    /// lineup text.
    fn top_results(&self, n: usize) -> Result<Vec<FitnessRecord>, SinkError>;

    /// All log rows for one game, in at-bat order.
    fn play_log(&self, game_id: u64) -> Result<Vec<PlayLogEntry>, SinkError>;

    /// Number of stored results.
    fn result_count(&self) -> Result<usize, SinkError>;
}
