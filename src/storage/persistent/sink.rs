//! Journal-backed result sink.

use std::path::Path;
use std::sync::RwLock;

use tracing::info;

use crate::simulation::PlayLogEntry;
use crate::storage::memory::ResultIndex;
use crate::storage::traits::{FitnessRecord, ResultReader, ResultSink, SinkError};

use super::file_lock::JournalLock;
use super::journal::{JournalEntryKind, ResultJournal};
use super::JournalConfig;

const JOURNAL_FILE: &str = "results.journal";

fn lock_err(context: &'static str) -> SinkError {
    SinkError::BackendError(format!("poisoned lock: {context}"))
}

fn io_err(e: &std::io::Error) -> SinkError {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => SinkError::Unavailable(e.to_string()),
        _ => SinkError::BackendError(e.to_string()),
    }
}

/// Durable sink: every append goes to the journal first, then to an
/// in-memory index that serves reads.
pub struct PersistentResultSink {
    _lock: JournalLock,
    journal: ResultJournal,
    index: RwLock<ResultIndex>,
}

impl PersistentResultSink {
    /// Open (or create) the journal in `dir` and replay it.
    pub fn open(dir: &Path, config: &JournalConfig) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir).map_err(|e| io_err(&e))?;
        let path = dir.join(JOURNAL_FILE);
        let lock = JournalLock::acquire(&path).map_err(|e| io_err(&e))?;
        let (journal, recovery) = ResultJournal::open(&path, config.sync_on_write).map_err(|e| io_err(&e))?;

        let mut index = ResultIndex::default();
        for entry in recovery.entries {
            match entry.kind {
                JournalEntryKind::Result(record) => index.push_result(record),
                JournalEntryKind::PlayLogs(rows) => index.extend_logs(rows),
            }
        }
        info!(
            dir = %dir.display(),
            results = index.result_count(),
            log_rows = index.log_rows(),
            truncated_bytes = recovery.truncated_bytes,
            "result journal opened"
        );

        Ok(Self {
            _lock: lock,
            journal,
            index: RwLock::new(index),
        })
    }

    /// Sequence number of the last journal entry.
    #[must_use]
    pub fn journal_sequence(&self) -> u64 {
        self.journal.current_sequence()
    }
}

impl ResultSink for PersistentResultSink {
    fn append_result(&self, record: &FitnessRecord) -> Result<(), SinkError> {
        let mut index = self.index.write().map_err(|_| lock_err("journal.append_result"))?;
        self.journal
            .append(JournalEntryKind::Result(record.clone()))
            .map_err(|e| io_err(&e))?;
        index.push_result(record.clone());
        Ok(())
    }

    fn append_play_logs(&self, entries: &[PlayLogEntry]) -> Result<(), SinkError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut index = self.index.write().map_err(|_| lock_err("journal.append_play_logs"))?;
        self.journal
            .append(JournalEntryKind::PlayLogs(entries.to_vec()))
            .map_err(|e| io_err(&e))?;
        index.extend_logs(entries.iter().cloned());
        Ok(())
    }
}

impl ResultReader for PersistentResultSink {
    fn top_results(&self, n: usize) -> Result<Vec<FitnessRecord>, SinkError> {
        Ok(self.index.read().map_err(|_| lock_err("journal.top_results"))?.top(n))
    }

    fn play_log(&self, game_id: u64) -> Result<Vec<PlayLogEntry>, SinkError> {
        Ok(self.index.read().map_err(|_| lock_err("journal.play_log"))?.game(game_id))
    }

    fn result_count(&self) -> Result<usize, SinkError> {
        Ok(self
            .index
            .read()
            .map_err(|_| lock_err("journal.result_count"))?
            .result_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Outcome;
    use tempfile::tempdir;

    fn record(lineup: &str, score: f64) -> FitnessRecord {
        FitnessRecord {
            lineup: lineup.to_string(),
            average_score: score,
        }
    }

    #[test]
    fn replays_results_and_logs_on_reopen() {
        let dir = tempdir().unwrap();
        let config = JournalConfig::default();

        {
            let sink = PersistentResultSink::open(dir.path(), &config).unwrap();
            sink.append_result(&record("A | B", 3.5)).unwrap();
            sink.append_result(&record("B | A", 4.0)).unwrap();
            sink.append_play_logs(&[PlayLogEntry {
                game_id: 7,
                inning: 1,
                at_bat_number: 1,
                batter: "A".to_string(),
                event: Outcome::HomeRun,
                score: 1,
            }])
            .unwrap();
            assert_eq!(sink.journal_sequence(), 3);
        }

        let sink = PersistentResultSink::open(dir.path(), &config).unwrap();
        assert_eq!(sink.result_count().unwrap(), 2);
        assert_eq!(sink.top_results(1).unwrap()[0].lineup, "B | A");
        assert_eq!(sink.play_log(7).unwrap()[0].event, Outcome::HomeRun);
    }

    #[test]
    fn second_open_of_same_directory_is_refused() {
        let dir = tempdir().unwrap();
        let _first = PersistentResultSink::open(dir.path(), &JournalConfig::default()).unwrap();

        let err = PersistentResultSink::open(dir.path(), &JournalConfig::default())
            .err()
            .unwrap();
        assert!(err.is_retryable());
        assert!(err.to_string().contains(JOURNAL_FILE), "{err}");
    }

    #[test]
    fn empty_log_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let sink = PersistentResultSink::open(dir.path(), &JournalConfig::default()).unwrap();
        sink.append_play_logs(&[]).unwrap();
        assert_eq!(sink.journal_sequence(), 0);
    }
}
