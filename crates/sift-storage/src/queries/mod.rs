//! Synchronous queries, independent of the batch path.

pub mod formats;
pub mod nodes;
