//! Command locator: resolves a command name against $PATH.
//!
//! Every call looks at the filesystem again. Nothing is cached, so two
//! probes of the same name may disagree if the filesystem changed.

use nix::unistd::{access, AccessFlags};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Resolve `candidate` using the process `PATH`.
pub fn resolve(candidate: Option<&str>) -> Option<PathBuf> {
    let search_path = std::env::var_os("PATH");
    resolve_in(candidate, search_path.as_deref())
}

/// Resolve `candidate` using an explicit search path list.
///
/// A candidate containing a path separator is checked as-is and never
/// searched for. Otherwise each search entry is tried in order, with
/// surrounding double quotes stripped from the entry.
pub fn resolve_in(candidate: Option<&str>, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let candidate = candidate?;
    if candidate.is_empty() {
        return None;
    }

    if candidate.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(candidate);
        return is_executable(&path).then_some(path);
    }

    let search_path = search_path?;
    for entry in std::env::split_paths(search_path) {
        let entry = entry.to_string_lossy();
        let dir = entry.trim_matches('"');
        if dir.is_empty() {
            continue;
        }

        let path = Path::new(dir).join(candidate);
        if is_executable(&path) {
            return Some(path);
        }
    }

    None
}

/// Check that a path is a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}
