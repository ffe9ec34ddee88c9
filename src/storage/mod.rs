//! Result sinks for search output.
//!
//! Traits define the sink boundary; `memory` and `persistent` provide
//! backends; `writer` is the single-writer thread that funnels worker output
//! into whichever sink the search was given.

mod memory;
mod traits;
pub mod writer;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryResultSink;
pub use traits::{FitnessRecord, ResultReader, ResultSink, SinkError};
pub use writer::{BatchSender, SinkWriter, SinkWriterSummary, TaskBatch, UnflushedBatch};

#[cfg(feature = "persistent")]
pub use persistent::{open_journal, JournalConfig, PersistentResultSink};
