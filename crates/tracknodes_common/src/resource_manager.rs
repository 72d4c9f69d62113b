//! Resource-manager detection.
//!
//! Torque and PBS Pro both ship a `pbsnodes` binary with different flags;
//! Slurm ships `sinfo`. The kind is decided once per run from the resolved
//! binary and carried from there on as a [`ResourceManager`].

use crate::command_exec::{CommandOutput, CommandRunner};
use crate::error::{Result, TrackNodesError};
use crate::locator;
use crate::parsers::{parse_pbsnodes, parse_sinfo, ParsedOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name of the Torque / PBS Pro node tool
pub const PBSNODES: &str = "pbsnodes";

/// Base name of the Slurm node tool
pub const SINFO: &str = "sinfo";

/// First token of `pbsnodes --version` on PBS Pro
const PBSPRO_VERSION_TOKEN: &str = "pbs_version";

/// Candidates probed when no command is configured, in order.
pub const DEFAULT_CANDIDATES: [&str; 8] = [
    "pbsnodes",
    "/usr/bin/pbsnodes",
    "/bin/pbsnodes",
    "/usr/local/bin/pbsnodes",
    "sinfo",
    "/usr/bin/sinfo",
    "/bin/sinfo",
    "/usr/local/bin/sinfo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceManagerKind {
    Torque,
    PbsPro,
    Slurm,
}

impl ResourceManagerKind {
    /// Arguments for the node listing command
    pub fn list_args(&self) -> &'static [&'static str] {
        match self {
            Self::Torque => &["-nl"],
            Self::PbsPro => &["-l"],
            Self::Slurm => &["-dR"],
        }
    }

    /// Parse the listing command's stdout
    pub fn parse(&self, output: &str) -> ParsedOutput {
        match self {
            Self::Torque | Self::PbsPro => parse_pbsnodes(output),
            Self::Slurm => parse_sinfo(output),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Torque => "torque",
            Self::PbsPro => "pbspro",
            Self::Slurm => "slurm",
        }
    }
}

impl fmt::Display for ResourceManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected resource manager: its kind and the binary to invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceManager {
    pub kind: ResourceManagerKind,
    pub command: PathBuf,
}

impl ResourceManager {
    /// Run the node listing command and parse its output.
    pub fn sample<R: CommandRunner>(&self, runner: &R) -> Result<ParsedOutput> {
        let output = runner.run(&self.command, self.kind.list_args())?;
        let parsed = self.kind.parse(&output.stdout);
        debug!(
            "{} reported {} node(s), {} unparsable line(s)",
            self.kind,
            parsed.entries.len(),
            parsed.skipped.len()
        );
        Ok(parsed)
    }
}

/// Classify a resolved command by its base name.
///
/// `sinfo` is Slurm without any probing. `pbsnodes` runs `--version` and
/// looks only at the first token of the first output line.
pub fn detect<R: CommandRunner>(command: &Path, runner: &R) -> Result<ResourceManager> {
    let name = command
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let kind = match name.as_str() {
        SINFO => ResourceManagerKind::Slurm,
        PBSNODES => {
            let probe = runner.run(command, &["--version"])?;
            classify_pbsnodes(&probe)
        }
        _ => {
            return Err(TrackNodesError::UnsupportedResourceManager {
                path: command.to_path_buf(),
                name,
            })
        }
    };

    info!("Detected {} at {}", kind, command.display());
    Ok(ResourceManager {
        kind,
        command: command.to_path_buf(),
    })
}

fn classify_pbsnodes(probe: &CommandOutput) -> ResourceManagerKind {
    let first_token = probe
        .first_line()
        .and_then(|line| line.split_whitespace().next());

    if first_token == Some(PBSPRO_VERSION_TOKEN) {
        ResourceManagerKind::PbsPro
    } else {
        ResourceManagerKind::Torque
    }
}

/// Resolve and classify the resource-manager command.
///
/// An explicit command must resolve or the run fails with
/// `CommandNotFound`. Without one, [`DEFAULT_CANDIDATES`] are tried in order.
pub fn locate<R: CommandRunner>(explicit: Option<&str>, runner: &R) -> Result<ResourceManager> {
    locate_with(explicit, runner, locator::resolve)
}

/// Like [`locate`], with a caller-supplied resolver.
pub fn locate_with<R, F>(explicit: Option<&str>, runner: &R, resolve: F) -> Result<ResourceManager>
where
    R: CommandRunner,
    F: Fn(Option<&str>) -> Option<PathBuf>,
{
    if let Some(cmd) = explicit {
        let path = resolve(Some(cmd)).ok_or_else(|| TrackNodesError::CommandNotFound(cmd.to_string()))?;
        return detect(&path, runner);
    }

    for candidate in DEFAULT_CANDIDATES {
        if let Some(path) = resolve(Some(candidate)) {
            debug!("Resolved {} to {}", candidate, path.display());
            return detect(&path, runner);
        }
    }

    Err(TrackNodesError::NoResourceManagerFound {
        searched: DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect(),
    })
}
