//! Batch write pipeline: bounded work queue, per-generation statement
//! cache, and the writer thread that drains the queue in transactions.

pub mod commands;
pub mod queue;
pub mod statements;
pub mod writer;

pub use commands::WriterSignal;
pub use queue::WorkQueue;
pub use statements::StatementCache;
pub use writer::{BatchWriter, WriterOptions, WriterState};
