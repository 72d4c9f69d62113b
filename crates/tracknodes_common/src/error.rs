//! Error types for tracknodes.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackNodesError>;

#[derive(Error, Debug)]
pub enum TrackNodesError {
    #[error("Cannot find resource manager command {0:?} (not found or not executable)")]
    CommandNotFound(String),

    #[error("Cannot find pbsnodes or sinfo in PATH or standard locations (searched: {})", searched.join(", "))]
    NoResourceManagerFound { searched: Vec<String> },

    #[error("Unsupported resource manager {name:?} at {}: expected pbsnodes or sinfo", path.display())]
    UnsupportedResourceManager { path: PathBuf, name: String },

    #[error("Failed to run {command}: {source}")]
    Subprocess {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} did not finish within {secs}s and was killed")]
    CommandTimedOut { command: String, secs: u64 },

    #[error("Cannot open tracknodes database {}: {reason}", path.display())]
    StoreUnavailable { path: PathBuf, reason: String },

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl TrackNodesError {
    /// True when no usable resource manager was found. These happen before
    /// any store mutation is attempted.
    pub fn is_detection_failure(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound(_)
                | Self::NoResourceManagerFound { .. }
                | Self::UnsupportedResourceManager { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_resource_manager_lists_candidates() {
        let err = TrackNodesError::NoResourceManagerFound {
            searched: vec!["pbsnodes".to_string(), "sinfo".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("pbsnodes, sinfo"));
        assert!(err.is_detection_failure());
    }

    #[test]
    fn test_unsupported_names_path_and_base_name() {
        let err = TrackNodesError::UnsupportedResourceManager {
            path: PathBuf::from("/usr/bin/qstat"),
            name: "qstat".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/usr/bin/qstat"));
        assert!(msg.contains("\"qstat\""));
    }

    #[test]
    fn test_store_error_is_not_detection_failure() {
        let err = TrackNodesError::Store(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_detection_failure());
    }
}
