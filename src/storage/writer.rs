//! Single-writer sink aggregation.
//!
//! Workers never touch the sink directly. Each completed task sends one
//! `TaskBatch` over a bounded channel to a dedicated writer thread, which is
//! the only caller of the sink. Failed writes are retried with backoff; a
//! batch that still cannot be written is handed back in the summary instead
//! of being dropped. A sink that panics is treated as a non-retryable backend
//! failure; the writer thread itself keeps running.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use tracing::{debug, error, warn};

use crate::config::RetryPolicy;
use crate::error::{panic_message, LineupError, LineupResult};
use crate::simulation::PlayLogEntry;
use crate::storage::traits::{FitnessRecord, ResultSink, SinkError};

/// Everything one permutation task produced for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBatch {
    /// The lineup's fitness row.
    pub record: FitnessRecord,
    /// Play-log rows in at-bat order (empty when logging is off).
    pub play_log: Vec<PlayLogEntry>,
}

/// A batch the writer gave up on, with the last error seen.
#[derive(Debug, Clone, PartialEq)]
pub struct UnflushedBatch {
    /// The batch as the worker produced it.
    pub batch: TaskBatch,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Error from the final attempt.
    pub error: SinkError,
}

impl UnflushedBatch {
    /// A batch that never reached the writer thread.
    #[must_use]
    pub fn unsent(batch: TaskBatch) -> Self {
        Self {
            batch,
            attempts: 0,
            error: SinkError::BackendError("sink writer stopped before the batch was queued".to_string()),
        }
    }

    /// The failure as a top-level error.
    #[must_use]
    pub fn to_error(&self) -> LineupError {
        LineupError::SinkWriteFailure {
            attempts: self.attempts,
            source: self.error.clone(),
        }
    }
}

/// Outcome of a writer's lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkWriterSummary {
    /// Batches fully written.
    pub batches_written: u64,
    /// Batches that exhausted their retries.
    pub unflushed: Vec<UnflushedBatch>,
}

/// Cloneable submission handle given to workers.
#[derive(Debug, Clone)]
pub struct BatchSender {
    tx: Sender<TaskBatch>,
}

impl BatchSender {
    /// Hand a batch to the writer. Blocks while the writer queue is full.
    ///
    /// # Errors
    /// Returns the batch unchanged if the writer thread has stopped.
    pub fn send(&self, batch: TaskBatch) -> Result<(), TaskBatch> {
        self.tx.send(batch).map_err(SendError::into_inner)
    }
}

/// Owns the writer thread.
pub struct SinkWriter {
    tx: Sender<TaskBatch>,
    handle: JoinHandle<SinkWriterSummary>,
}

impl SinkWriter {
    /// Start the writer thread.
    pub fn start(sink: Arc<dyn ResultSink>, retry: RetryPolicy, queue_capacity: usize) -> LineupResult<Self> {
        let (tx, rx) = bounded::<TaskBatch>(queue_capacity.max(1));
        let handle = thread::Builder::new()
            .name("lineup-sink-writer".to_string())
            .spawn(move || drain(&*sink, retry, &rx))
            .map_err(|e| LineupError::internal(format!("failed to spawn sink writer: {e}")))?;
        Ok(Self { tx, handle })
    }

    /// A handle workers can clone and send through.
    #[must_use]
    pub fn sender(&self) -> BatchSender {
        BatchSender { tx: self.tx.clone() }
    }

    /// Close the queue, wait for every queued batch, and return the summary.
    ///
    /// All `BatchSender` clones must be dropped first or this blocks.
    pub fn finish(self) -> LineupResult<SinkWriterSummary> {
        drop(self.tx);
        self.handle
            .join()
            .map_err(|_| LineupError::internal("sink writer thread panicked"))
    }
}

fn drain(sink: &dyn ResultSink, retry: RetryPolicy, rx: &Receiver<TaskBatch>) -> SinkWriterSummary {
    let mut summary = SinkWriterSummary::default();
    for batch in rx {
        match write_with_retry(sink, &batch, retry) {
            Ok(()) => summary.batches_written += 1,
            Err((attempts, err)) => {
                error!(lineup = %batch.record.lineup, attempts, error = %err, "sink write abandoned; batch retained");
                summary.unflushed.push(UnflushedBatch {
                    batch,
                    attempts,
                    error: err,
                });
            }
        }
    }
    debug!(
        written = summary.batches_written,
        unflushed = summary.unflushed.len(),
        "sink writer drained"
    );
    summary
}

/// Write one batch. The result row is written at most once even when the log
/// append needs another attempt.
fn write_with_retry(sink: &dyn ResultSink, batch: &TaskBatch, retry: RetryPolicy) -> Result<(), (u32, SinkError)> {
    let max_attempts = retry.max_attempts.max(1);
    let mut result_written = false;
    let mut attempt = 0;

    loop {
        attempt += 1;
        thread::sleep(retry.backoff(attempt));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| write_once(sink, batch, &mut result_written)))
            .unwrap_or_else(|payload| Err(SinkError::BackendError(format!("sink {}", panic_message(payload.as_ref())))));
        match outcome {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(lineup = %batch.record.lineup, attempt, error = %err, "sink write failed; retrying");
            }
            Err(err) => return Err((attempt, err)),
        }
    }
}

fn write_once(sink: &dyn ResultSink, batch: &TaskBatch, result_written: &mut bool) -> Result<(), SinkError> {
    if !*result_written {
        sink.append_result(&batch.record)?;
        *result_written = true;
    }
    if !batch.play_log.is_empty() {
        sink.append_play_logs(&batch.play_log)?;
    }
    Ok(())
}
