//! Storage traits and the statistics they report.

pub mod profile_batch;
pub mod profile_results;

pub use profile_batch::{CommitReport, WriteFailure, WriteStats};
pub use profile_results::IProfileResults;
