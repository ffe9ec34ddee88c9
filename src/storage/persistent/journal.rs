//! Append-only result journal.
//!
//! Every sink write becomes one journal entry. On open the journal is
//! scanned; entries up to the first torn or corrupt frame are kept and the
//! rest of the file is truncated so new appends land on a clean boundary.
//! A failed append is rolled back to the last whole frame before the error is
//! returned; if that rollback fails too, the journal refuses further appends.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [ENTRY 1: codec-encoded JournalEntry]
//! [ENTRY 2: codec-encoded JournalEntry]
//! ...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::simulation::PlayLogEntry;
use crate::storage::traits::FitnessRecord;

use super::codec;

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonically increasing sequence number.
    pub sequence: u64,
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// What was written.
    pub kind: JournalEntryKind,
}

/// Payload of a journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEntryKind {
    /// One lineup result.
    Result(FitnessRecord),
    /// A batch of play-log rows.
    PlayLogs(Vec<PlayLogEntry>),
}

/// What a scan of an existing journal found.
#[derive(Debug)]
pub struct Recovery {
    /// Entries that decoded cleanly, in file order.
    pub entries: Vec<JournalEntry>,
    /// Bytes dropped from the tail.
    pub truncated_bytes: u64,
}

/// Append-only journal file. Thread-safe via internal mutex.
pub struct ResultJournal {
    path: PathBuf,
    state: Mutex<WriterState>,
    sync_on_write: bool,
}

struct WriterState {
    file: File,
    sequence: u64,
    /// File length after the last whole frame.
    committed_len: u64,
    /// Set when a rollback failed; the tail may hold a torn frame.
    broken: bool,
}

impl WriterState {
    fn write_frame(&mut self, frame: &[u8], sync: bool) -> IoResult<()> {
        self.file.write_all(frame)?;
        if sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Cut the file back to the last whole frame.
    fn roll_back(&mut self) -> IoResult<()> {
        self.file.set_len(self.committed_len)?;
        self.file.sync_all()
    }
}

impl ResultJournal {
    /// Open or create a journal file, returning it together with every entry
    /// that survived.
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<(Self, Recovery)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let recovery = if file_len == 0 {
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
            Recovery {
                entries: Vec::new(),
                truncated_bytes: 0,
            }
        } else {
            let (entries, valid_len) = scan(path)?;
            let truncated_bytes = file_len - valid_len;
            if truncated_bytes > 0 {
                warn!(
                    path = %path.display(),
                    kept = entries.len(),
                    truncated_bytes,
                    "journal tail is torn or corrupt; truncating"
                );
                file.set_len(valid_len)?;
                file.sync_all()?;
            }
            Recovery { entries, truncated_bytes }
        };
        drop(file);

        let sequence = recovery.entries.last().map_or(0, |e| e.sequence);
        let file = OpenOptions::new().append(true).open(path)?;
        let committed_len = file.metadata()?.len();

        Ok((
            Self {
                path: path.to_path_buf(),
                state: Mutex::new(WriterState {
                    file,
                    sequence,
                    committed_len,
                    broken: false,
                }),
                sync_on_write,
            },
            recovery,
        ))
    }

    /// Append an entry and return its sequence number.
    ///
    /// On error nothing of the entry remains in the file.
    pub fn append(&self, kind: JournalEntryKind) -> IoResult<u64> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| IoError::new(ErrorKind::Other, "journal writer lock poisoned"))?;
        if state.broken {
            return Err(IoError::new(
                ErrorKind::Other,
                format!("journal {} has a torn tail and no longer accepts appends", self.path.display()),
            ));
        }

        let candidate = state.sequence + 1;
        let entry = JournalEntry {
            sequence: candidate,
            timestamp: Utc::now(),
            kind,
        };
        let encoded = codec::encode(&entry)?;

        if let Err(e) = state.write_frame(&encoded, self.sync_on_write) {
            match state.roll_back() {
                Ok(()) => warn!(
                    path = %self.path.display(),
                    sequence = candidate,
                    error = %e,
                    "journal append failed; partial frame removed"
                ),
                Err(rollback) => {
                    state.broken = true;
                    error!(
                        path = %self.path.display(),
                        sequence = candidate,
                        error = %e,
                        rollback_error = %rollback,
                        "journal append failed and could not be rolled back"
                    );
                }
            }
            return Err(e);
        }

        state.committed_len += encoded.len() as u64;
        state.sequence = candidate;
        Ok(candidate)
    }

    /// Sequence number of the last entry written.
    pub fn current_sequence(&self) -> u64 {
        self.state.lock().map_or(0, |s| s.sequence)
    }

    /// Journal file size in bytes.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

/// Read entries until the first bad frame. Returns the entries and the byte
/// offset where the valid prefix ends.
fn scan(path: &Path) -> IoResult<(Vec<JournalEntry>, u64)> {
    let mut reader = BufReader::new(File::open(path)?);
    codec::read_header(&mut reader)?;

    let mut entries = Vec::new();
    let mut offset = codec::HEADER_LEN;
    loop {
        match codec::decode::<JournalEntry>(&mut reader) {
            Ok((entry, consumed)) => {
                offset += consumed;
                entries.push(entry);
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(
                    path = %path.display(),
                    after_sequence = entries.last().map_or(0, |e: &JournalEntry| e.sequence),
                    error = %e,
                    "journal frame failed validation"
                );
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok((entries, offset))
}
