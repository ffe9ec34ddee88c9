//! Durable result storage.
//!
//! - an append-only journal with CRC32-checked frames
//! - an exclusive lock file beside the journal so one process writes at a time
//! - replay into an in-memory index on open
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │        PersistentResultSink           │
//! │  ┌──────────────┐  ┌──────────────┐  │
//! │  │ ResultJournal│  │ ResultIndex  │  │
//! │  │ (append-only)│  │ (reads)      │  │
//! │  └──────┬───────┘  └──────────────┘  │
//! │         ↓                            │
//! │  ┌──────────────┐                    │
//! │  │ JournalLock  │                    │
//! │  │ (flock)      │                    │
//! │  └──────────────┘                    │
//! └──────────────────────────────────────┘
//! ```

mod codec;
mod file_lock;
mod journal;
mod sink;

pub use file_lock::JournalLock;
pub use journal::{JournalEntry, JournalEntryKind, Recovery, ResultJournal};
pub use sink::PersistentResultSink;

use std::path::Path;

use crate::storage::traits::SinkError;

/// Configuration for the result journal.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Whether to fsync after every append (slower but safer).
    pub sync_on_write: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { sync_on_write: true }
    }
}

/// Open a journal-backed sink in `dir`, creating the directory if needed.
///
/// # Example
///
/// ```ignore
/// use lineup_optimizer::storage::persistent::open_journal;
///
/// let sink = open_journal("./results", None)?;
/// ```
pub fn open_journal(dir: impl AsRef<Path>, config: Option<JournalConfig>) -> Result<PersistentResultSink, SinkError> {
    PersistentResultSink::open(dir.as_ref(), &config.unwrap_or_default())
}
