//! Exhaustive parallel lineup search.
//!
//! The coordinator enumerates batting orders lazily and feeds them through a
//! bounded queue to a fixed pool of worker threads. Each worker evaluates one
//! order to completion with its own random stream, hands the sink batch to
//! the single writer thread, and reports back. The coordinator folds reports
//! into the best-lineup reduction and the failure list. A computed fitness
//! always reaches the report, whether or not the sink took it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::error::{panic_message, ConfigurationError, LineupError, LineupResult};
use crate::roster::Roster;
use crate::simulation::{NoPlayLog, PlayLogEntry, SeasonEvaluator, SeasonSummary};
use crate::storage::{BatchSender, FitnessRecord, ResultSink, SinkWriter, SinkWriterSummary, TaskBatch, UnflushedBatch};

use super::permutations::{permutation_count, Permutations};
use super::report::{FailedPermutation, FailureKind, LineupCandidate, RunId, SearchReport};

/// Seed of the draw stream for one lineup.
///
/// Depends only on the base seed and the lineup text, never on which worker
/// evaluates it or when.
#[must_use]
pub fn task_seed(base_seed: u64, lineup: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&base_seed.to_le_bytes());
    hasher.update(lineup.as_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

struct Job {
    index: u64,
    order: Vec<usize>,
}

enum TaskReport {
    Succeeded {
        candidate: LineupCandidate,
        /// Batch the writer could not accept.
        unsent: Option<TaskBatch>,
    },
    Failed(FailedPermutation),
}

/// Everything a worker needs; cloned into each thread.
#[derive(Clone)]
struct TaskContext {
    roster: Roster,
    evaluator: SeasonEvaluator,
    base_seed: u64,
    record_play_logs: bool,
}

impl TaskContext {
    fn evaluate(&self, index: u64, order: &[usize], log: &mut Vec<PlayLogEntry>) -> LineupResult<SeasonSummary> {
        let hitters = self
            .roster
            .order(order)
            .ok_or_else(|| LineupError::internal(format!("order {order:?} does not index the roster")))?;
        let lineup = self.roster.lineup_id(order);
        let mut rng = SmallRng::seed_from_u64(task_seed(self.base_seed, &lineup));
        let first_game_id = index * u64::from(self.evaluator.games_per_season());

        if self.record_play_logs {
            self.evaluator.evaluate(&hitters, first_game_id, &mut rng, log)
        } else {
            self.evaluator.evaluate(&hitters, first_game_id, &mut rng, &mut NoPlayLog)
        }
    }

    /// Evaluate one job, converting errors and panics into a failure report.
    fn run(&self, job: Job, sink: &BatchSender) -> TaskReport {
        let lineup = self.roster.lineup_id(&job.order);
        let mut log = Vec::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.evaluate(job.index, &job.order, &mut log)));
        let (kind, cause) = match outcome {
            Ok(Ok(summary)) => {
                let batch = TaskBatch {
                    record: FitnessRecord {
                        lineup: lineup.clone(),
                        average_score: summary.fitness,
                    },
                    play_log: log,
                };
                let unsent = sink.send(batch).err();
                if unsent.is_some() {
                    error!(lineup = %lineup, "sink writer stopped; result kept in the report");
                }
                return TaskReport::Succeeded {
                    candidate: LineupCandidate {
                        permutation_index: job.index,
                        order: job.order,
                        lineup,
                        fitness: summary.fitness,
                    },
                    unsent,
                };
            }
            Ok(Err(e)) => (FailureKind::of(&e), e.to_string()),
            Err(payload) => (FailureKind::Panic, panic_message(payload.as_ref())),
        };

        let failure = LineupError::WorkerTaskFailure {
            lineup: lineup.clone(),
            cause: cause.clone(),
        };
        warn!(permutation = job.index, error = %failure, "permutation failed");
        TaskReport::Failed(FailedPermutation {
            permutation_index: job.index,
            lineup,
            kind,
            cause,
        })
    }
}

/// Fixed pool of search workers.
struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn start(
        workers: usize,
        queue_capacity: usize,
        ctx: &TaskContext,
        sink: &SinkWriter,
        reports: &Sender<TaskReport>,
    ) -> LineupResult<Self> {
        let workers = workers.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity.max(1));

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let ctx = ctx.clone();
            let sink = sink.sender();
            let reports = reports.clone();
            let handle = thread::Builder::new()
                .name(format!("lineup-worker-{idx}"))
                .spawn(move || {
                    for job in rx {
                        if reports.send(ctx.run(job, &sink)).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| LineupError::internal(format!("failed to spawn lineup worker: {e}")))?;
            handles.push(handle);
        }

        Ok(Self { tx, workers: handles })
    }

    fn shutdown(self) {
        // Close the queue: workers drain what is queued, then exit.
        drop(self.tx);
        for handle in self.workers {
            if handle.join().is_err() {
                error!("lineup worker thread panicked");
            }
        }
    }
}

/// Running totals folded from task reports.
#[derive(Default)]
struct Reduction {
    outstanding: u64,
    succeeded: u64,
    failed: Vec<FailedPermutation>,
    best: Option<LineupCandidate>,
    unsent: Vec<UnflushedBatch>,
}

impl Reduction {
    fn fold(&mut self, report: TaskReport) {
        self.outstanding -= 1;
        match report {
            TaskReport::Succeeded { candidate, unsent } => {
                debug!(
                    permutation = candidate.permutation_index,
                    lineup = %candidate.lineup,
                    fitness = candidate.fitness,
                    "permutation evaluated"
                );
                self.succeeded += 1;
                if self.best.as_ref().map_or(true, |best| candidate.beats(best)) {
                    self.best = Some(candidate);
                }
                if let Some(batch) = unsent {
                    self.unsent.push(UnflushedBatch::unsent(batch));
                }
            }
            TaskReport::Failed(failure) => self.failed.push(failure),
        }
    }
}

/// Searches every batting order of a roster for the highest fitness.
pub struct PermutationSearchCoordinator {
    roster: Roster,
    config: SearchConfig,
    sink: Arc<dyn ResultSink>,
}

impl PermutationSearchCoordinator {
    /// Create a coordinator. The config is validated here.
    pub fn new(roster: Roster, config: SearchConfig, sink: Arc<dyn ResultSink>) -> LineupResult<Self> {
        Ok(Self {
            roster,
            config: config.validate()?,
            sink,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of orderings of the roster.
    pub fn total_permutations(&self) -> LineupResult<u64> {
        permutation_count(self.roster.len()).ok_or_else(|| {
            ConfigurationError::invalid(format!("a roster of {} hitters has too many orderings", self.roster.len()))
                .into()
        })
    }

    /// Evaluate one order with the draw stream the search would give it.
    ///
    /// `index` is the order's position in the enumeration (it fixes game ids).
    pub fn evaluate_order(&self, index: u64, order: &[usize], base_seed: u64) -> LineupResult<SeasonSummary> {
        self.context(base_seed).evaluate(index, order, &mut Vec::new())
    }

    fn context(&self, base_seed: u64) -> TaskContext {
        TaskContext {
            roster: self.roster.clone(),
            evaluator: SeasonEvaluator::from_config(&self.config),
            base_seed,
            record_play_logs: self.config.record_play_logs,
        }
    }

    /// Run the search to completion.
    ///
    /// Individual permutation failures are recorded in the report, never
    /// returned as errors. An `Err` means the search machinery itself broke.
    pub fn run(&self) -> LineupResult<SearchReport> {
        let started = Instant::now();
        let run_id = RunId::new();
        let seed = self.config.seed.unwrap_or_else(rand::random::<u64>);
        let total = self.total_permutations()?;
        let budget = self.config.max_permutations.map_or(total, |max| max.min(total));

        info!(
            run_id = %run_id,
            seed,
            hitters = self.roster.len(),
            total_permutations = total,
            budget,
            workers = self.config.worker_pool_size,
            games_per_season = self.config.games_per_season,
            "lineup search started"
        );

        let writer = SinkWriter::start(Arc::clone(&self.sink), self.config.sink_retry, self.config.queue_capacity)?;
        let (report_tx, report_rx) = unbounded::<TaskReport>();
        let pool = WorkerPool::start(
            self.config.worker_pool_size,
            self.config.queue_capacity,
            &self.context(seed),
            &writer,
            &report_tx,
        )?;
        drop(report_tx);

        let mut reduction = Reduction::default();
        let mut dispatched = 0u64;
        let mut index = 0u64;
        for order in Permutations::new(self.roster.len()) {
            if dispatched >= budget {
                break;
            }
            let mut job = Job { index, order };
            loop {
                match pool.tx.try_send(job) {
                    Ok(()) => break,
                    Err(TrySendError::Full(back)) => {
                        // Queue is full; wait for a worker to finish something.
                        job = back;
                        let report = report_rx
                            .recv()
                            .map_err(|_| LineupError::internal("all lineup workers exited during dispatch"))?;
                        reduction.fold(report);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        return Err(LineupError::internal("lineup worker queue disconnected"));
                    }
                }
            }
            dispatched += 1;
            reduction.outstanding += 1;
            index += 1;

            while let Ok(report) = report_rx.try_recv() {
                reduction.fold(report);
            }
        }

        while reduction.outstanding > 0 {
            match report_rx.recv() {
                Ok(report) => reduction.fold(report),
                Err(_) => {
                    pool.shutdown();
                    return Err(LineupError::internal(format!(
                        "{} permutation(s) never reported back",
                        reduction.outstanding
                    )));
                }
            }
        }
        pool.shutdown();

        let sink_summary = writer.finish().unwrap_or_else(|e| {
            error!(error = %e, "sink writer did not shut down cleanly");
            SinkWriterSummary::default()
        });
        let mut unflushed = reduction.unsent;
        unflushed.extend(sink_summary.unflushed);
        if !unflushed.is_empty() {
            warn!(
                unflushed = unflushed.len(),
                "some results could not be written to the sink; they are kept in the report"
            );
        }

        let report = SearchReport {
            run_id,
            seed,
            total_permutations: total,
            dispatched,
            succeeded: reduction.succeeded,
            failed: reduction.failed,
            skipped: total - dispatched,
            best: reduction.best,
            unflushed,
            elapsed: started.elapsed(),
        };

        info!(
            run_id = %report.run_id,
            dispatched = report.dispatched,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            skipped = report.skipped,
            best_fitness = report.best.as_ref().map(|b| b.fitness),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "lineup search finished"
        );
        Ok(report)
    }
}
