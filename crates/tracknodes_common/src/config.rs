//! Configuration for tracknodes.
//!
//! Loads settings from /etc/tracknodes/config.toml, then the per-user config
//! directory, or uses defaults. Command-line flags override file values.

use crate::command_exec::DEFAULT_TIMEOUT_SECS;
use crate::error::{Result, TrackNodesError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/tracknodes/config.toml";

/// System database directory
pub const SYSTEM_DB_DIR: &str = "/var/lib/tracknodes";

/// Database file name
pub const DB_FILE_NAME: &str = "tracknodes.db";

/// Contents of a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Resource-manager command (pbsnodes or sinfo)
    #[serde(default)]
    pub nodes_cmd: Option<String>,

    /// Database location
    #[serde(default)]
    pub dbfile: Option<PathBuf>,

    /// Verbose diagnostics
    #[serde(default)]
    pub verbose: Option<bool>,

    /// Watchdog for resource-manager commands, 0 disables it
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    /// File this config was read from, None for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl FileConfig {
    /// Load from an explicit path. Missing or invalid files are errors.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TrackNodesError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: FileConfig =
            toml::from_str(&content).map_err(|e| TrackNodesError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load the first default config file that exists, or defaults.
    ///
    /// A default file that exists but does not parse is still an error.
    pub fn load_default() -> Result<Self> {
        for path in default_config_paths() {
            if path.is_file() {
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Explicit path if given, otherwise the default search.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load_default(),
        }
    }
}

/// Config files searched when no `--config` is given, in order
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tracknodes").join("config.toml"));
    }
    paths
}

/// Default database path.
///
/// Root, or any host that already has the system directory, uses
/// /var/lib/tracknodes; everybody else gets the per-user data directory.
pub fn default_db_path() -> PathBuf {
    let system_dir = Path::new(SYSTEM_DB_DIR);
    if nix::unistd::geteuid().is_root() || system_dir.is_dir() {
        return system_dir.join(DB_FILE_NAME);
    }

    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("tracknodes")
        .join(DB_FILE_NAME)
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub nodes_cmd: Option<String>,
    pub dbfile: Option<PathBuf>,
    pub verbose: bool,
    pub command_timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub nodes_cmd: Option<String>,
    pub db_path: PathBuf,
    pub verbose: bool,
    pub command_timeout: Option<Duration>,
}

impl Settings {
    /// Merge flags over file values over defaults.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Self {
        let timeout_secs = overrides
            .command_timeout_secs
            .or(file.command_timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            nodes_cmd: overrides.nodes_cmd.or(file.nodes_cmd),
            db_path: overrides
                .dbfile
                .or(file.dbfile)
                .unwrap_or_else(default_db_path),
            verbose: overrides.verbose || file.verbose.unwrap_or(false),
            command_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }
}
