//! Error types for the lineup optimizer.
//!
//! All errors are strongly typed using thiserror. Each layer owns the errors
//! it can raise; `LineupError` is the umbrella the search coordinator and the
//! public entry points return.

use thiserror::Error;

use crate::storage::SinkError;

/// Errors caused by bad input data or settings.
///
/// These are fatal to the evaluation that hit them, never to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Hitter '{hitter}' has zero {field}; outcome rates are undefined")]
    ZeroDenominator {
        hitter: String,
        field: &'static str,
    },

    #[error("Hitter '{hitter}' has a negative {field} count")]
    NegativeCount {
        hitter: String,
        field: &'static str,
    },

    #[error("Hitter '{hitter}' has pace {pace} outside [0.0, 1.0]")]
    PaceOutOfRange {
        hitter: String,
        pace: f64,
    },

    #[error("Hitter '{hitter}' outcome probabilities sum to {total}, which exceeds 1.0")]
    ProbabilityOverflow {
        hitter: String,
        total: f64,
    },

    #[error("Roster is empty")]
    EmptyRoster,

    #[error("Roster lists hitter '{name}' more than once")]
    DuplicateHitter {
        name: String,
    },

    #[error("Invalid search configuration: {reason}")]
    InvalidSearchConfig {
        reason: String,
    },

    #[error("Failed to parse input: {message}")]
    Parse {
        message: String,
    },
}

impl ConfigurationError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidSearchConfig {
            reason: reason.into(),
        }
    }
}

/// Base-state invariants that a transition would break.
///
/// Fatal to the simulation unit that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Event applied after the third out; the half-inning is already over")]
    HalfInningOver,

    #[error("Out counter left its valid range: {outs}")]
    OutsOutOfRange {
        outs: u8,
    },

    #[error("Double play not permitted with {outs} outs (runner on first: {runner_on_first})")]
    DoublePlayNotPermitted {
        outs: u8,
        runner_on_first: bool,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum LineupError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Evaluation of lineup [{lineup}] failed: {cause}")]
    WorkerTaskFailure {
        lineup: String,
        cause: String,
    },

    #[error("Sink write failed after {attempts} attempt(s): {source}")]
    SinkWriteFailure {
        attempts: u32,
        #[source]
        source: SinkError,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl LineupError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is an invariant violation.
    #[must_use]
    pub const fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }

    /// Returns true if this error was raised by a sink, directly or after retries.
    #[must_use]
    pub const fn is_sink(&self) -> bool {
        matches!(self, Self::Sink(_) | Self::SinkWriteFailure { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Sink(e) => e.is_retryable(),
            // Retries were already spent.
            Self::SinkWriteFailure { .. } => false,
            Self::Configuration(_)
            | Self::Invariant(_)
            | Self::WorkerTaskFailure { .. }
            | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for lineup operations.
pub type LineupResult<T> = Result<T, LineupError>;

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
