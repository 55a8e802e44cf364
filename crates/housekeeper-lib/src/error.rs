//! Error types shared by all housekeeping components

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for housekeeping operations
pub type Result<T> = std::result::Result<T, HousekeeperError>;

/// Housekeeping error types
#[derive(Debug, Error)]
pub enum HousekeeperError {
    /// Filesystem operation failed on a specific path
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A backup with the same timestamp already exists
    #[error("backup destination already exists: {}", .0.display())]
    BackupCollision(PathBuf),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    /// Trigger definition violates its invariants
    #[error("invalid trigger for job '{job}': {reason}")]
    InvalidTrigger { job: String, reason: String },

    /// Two jobs registered under the same name
    #[error("duplicate job name: {0}")]
    DuplicateJob(String),

    /// Report serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Job action failed
    #[error("execution error: {0}")]
    Execution(String),
}

impl HousekeeperError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors that should abort startup
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::ConfigSource(_)
                | Self::InvalidTrigger { .. }
                | Self::DuplicateJob(_)
        )
    }
}

/// Attach an operation name and path to `std::io` results
pub trait IoResultExt<T> {
    fn with_path(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| HousekeeperError::io(op, path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message_includes_path_and_op() {
        let err: Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
            .with_path("remove file", Path::new("/tmp/a.txt"));
        let message = err.unwrap_err().to_string();

        assert!(message.contains("remove file"));
        assert!(message.contains("/tmp/a.txt"));
        assert!(message.contains("gone"));
    }

    #[test]
    fn test_config_classification() {
        assert!(HousekeeperError::DuplicateJob("a".into()).is_config());
        assert!(HousekeeperError::Config("bad".into()).is_config());
        assert!(!HousekeeperError::Execution("boom".into()).is_config());
        assert!(!HousekeeperError::BackupCollision(PathBuf::from("x")).is_config());
    }
}
