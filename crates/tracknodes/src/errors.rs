//! Exit codes for tracknodes

use tracknodes_common::TrackNodesError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Resource manager missing or not supported
pub const EXIT_NO_RESOURCE_MANAGER: i32 = 64;

/// Resource manager command could not run or timed out
pub const EXIT_SUBPROCESS: i32 = 70;

/// Database could not be opened or written
pub const EXIT_STORE: i32 = 74;

/// Bad configuration file
pub const EXIT_CONFIG: i32 = 78;

/// Map an error chain to a process exit code
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TrackNodesError>() {
        Some(e) if e.is_detection_failure() => EXIT_NO_RESOURCE_MANAGER,
        Some(e) => match e {
            TrackNodesError::Subprocess { .. } | TrackNodesError::CommandTimedOut { .. } => {
                EXIT_SUBPROCESS
            }
            TrackNodesError::StoreUnavailable { .. } | TrackNodesError::Store(_) => EXIT_STORE,
            TrackNodesError::Config { .. } => EXIT_CONFIG,
            _ => EXIT_GENERAL_ERROR,
        },
        None => EXIT_GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes() {
        let err = anyhow::Error::from(TrackNodesError::CommandNotFound("sinfo".into()));
        assert_eq!(exit_code(&err), EXIT_NO_RESOURCE_MANAGER);

        let err = anyhow::Error::from(TrackNodesError::StoreUnavailable {
            path: PathBuf::from("/x.db"),
            reason: "denied".into(),
        });
        assert_eq!(exit_code(&err), EXIT_STORE);

        let err = anyhow::Error::from(TrackNodesError::UnsupportedResourceManager {
            path: PathBuf::from("/usr/bin/qstat"),
            name: "qstat".into(),
        });
        assert_eq!(exit_code(&err), EXIT_NO_RESOURCE_MANAGER);

        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&err), EXIT_GENERAL_ERROR);
    }

    #[test]
    fn test_exit_code_sees_through_context() {
        let err = anyhow::Error::from(TrackNodesError::CommandTimedOut {
            command: "sinfo -dR".into(),
            secs: 5,
        })
        .context("update failed");
        assert_eq!(exit_code(&err), EXIT_SUBPROCESS);
    }
}
