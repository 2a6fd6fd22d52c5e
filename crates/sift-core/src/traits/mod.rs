pub mod storage;

pub use storage::{CommitReport, IProfileResults, WriteFailure, WriteStats};
