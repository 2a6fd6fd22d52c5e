pub mod collections;
pub mod format;
pub mod node;
pub mod status;
