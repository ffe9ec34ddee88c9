//! In-memory result sink.
//!
//! Thread-safe and unbounded. Intended for tests, small searches, and as the
//! read index behind the persistent journal.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::simulation::PlayLogEntry;
use crate::storage::traits::{FitnessRecord, ResultReader, ResultSink, SinkError};

fn lock_err(context: &'static str) -> SinkError {
    SinkError::BackendError(format!("poisoned lock: {context}"))
}

fn by_score_desc(a: &FitnessRecord, b: &FitnessRecord) -> Ordering {
    b.average_score
        .total_cmp(&a.average_score)
        .then_with(|| a.lineup.cmp(&b.lineup))
}

/// Results plus play logs keyed by game.
#[derive(Debug, Default)]
pub(crate) struct ResultIndex {
    results: Vec<FitnessRecord>,
    logs: BTreeMap<u64, Vec<PlayLogEntry>>,
    log_rows: usize,
}

impl ResultIndex {
    pub(crate) fn push_result(&mut self, record: FitnessRecord) {
        self.results.push(record);
    }

    pub(crate) fn extend_logs(&mut self, entries: impl IntoIterator<Item = PlayLogEntry>) {
        for entry in entries {
            self.logs.entry(entry.game_id).or_default().push(entry);
            self.log_rows += 1;
        }
    }

    pub(crate) fn top(&self, n: usize) -> Vec<FitnessRecord> {
        let mut sorted = self.results.clone();
        sorted.sort_by(by_score_desc);
        sorted.truncate(n);
        sorted
    }

    pub(crate) fn game(&self, game_id: u64) -> Vec<PlayLogEntry> {
        self.logs.get(&game_id).cloned().unwrap_or_default()
    }

    pub(crate) fn result_count(&self) -> usize {
        self.results.len()
    }

    pub(crate) fn log_rows(&self) -> usize {
        self.log_rows
    }
}

/// Thread-safe in-memory sink.
#[derive(Debug, Default)]
pub struct InMemoryResultSink {
    index: RwLock<ResultIndex>,
}

impl InMemoryResultSink {
    /// Create a new empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total play-log rows stored.
    pub fn log_row_count(&self) -> Result<usize, SinkError> {
        Ok(self.index.read().map_err(|_| lock_err("sink.log_rows"))?.log_rows())
    }
}

impl ResultSink for InMemoryResultSink {
    fn append_result(&self, record: &FitnessRecord) -> Result<(), SinkError> {
        self.index
            .write()
            .map_err(|_| lock_err("sink.append_result"))?
            .push_result(record.clone());
        Ok(())
    }

    fn append_play_logs(&self, entries: &[PlayLogEntry]) -> Result<(), SinkError> {
        self.index
            .write()
            .map_err(|_| lock_err("sink.append_play_logs"))?
            .extend_logs(entries.iter().cloned());
        Ok(())
    }
}

impl ResultReader for InMemoryResultSink {
    fn top_results(&self, n: usize) -> Result<Vec<FitnessRecord>, SinkError> {
        Ok(self.index.read().map_err(|_| lock_err("sink.top_results"))?.top(n))
    }

    fn play_log(&self, game_id: u64) -> Result<Vec<PlayLogEntry>, SinkError> {
        Ok(self.index.read().map_err(|_| lock_err("sink.play_log"))?.game(game_id))
    }

    fn result_count(&self) -> Result<usize, SinkError> {
        Ok(self.index.read().map_err(|_| lock_err("sink.result_count"))?.result_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Outcome;

    fn record(lineup: &str, score: f64) -> FitnessRecord {
        FitnessRecord {
            lineup: lineup.to_string(),
            average_score: score,
        }
    }

    fn entry(game_id: u64, at_bat_number: u32) -> PlayLogEntry {
        PlayLogEntry {
            game_id,
            inning: 1,
            at_bat_number,
            batter: "x".to_string(),
            event: Outcome::Out,
            score: 0,
        }
    }

    #[test]
    fn top_results_sorted_descending_with_lineup_tiebreak() {
        let sink = InMemoryResultSink::new();
        sink.append_result(&record("B", 4.0)).unwrap();
        sink.append_result(&record("C", 5.5)).unwrap();
        sink.append_result(&record("A", 4.0)).unwrap();
        sink.append_result(&record("D", 1.0)).unwrap();

        let top = sink.top_results(3).unwrap();
        let names: Vec<_> = top.iter().map(|r| r.lineup.as_str()).collect();
        assert_eq!(names, ["C", "A", "B"]);
        assert_eq!(sink.result_count().unwrap(), 4);
        assert_eq!(sink.top_results(10).unwrap().len(), 4);
    }

    #[test]
    fn play_log_filters_by_game_and_keeps_order() {
        let sink = InMemoryResultSink::new();
        sink.append_play_logs(&[entry(1, 1), entry(1, 2), entry(2, 1)]).unwrap();
        sink.append_play_logs(&[entry(1, 3)]).unwrap();

        let game1 = sink.play_log(1).unwrap();
        let order: Vec<_> = game1.iter().map(|e| e.at_bat_number).collect();
        assert_eq!(order, [1, 2, 3]);
        assert_eq!(sink.play_log(2).unwrap().len(), 1);
        assert!(sink.play_log(99).unwrap().is_empty());
        assert_eq!(sink.log_row_count().unwrap(), 4);
    }
}
