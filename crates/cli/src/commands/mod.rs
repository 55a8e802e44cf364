//! CLI command implementations

pub mod files;
pub mod scheduler;
pub mod system;
