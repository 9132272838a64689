use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::XvmError;

/// Name of the directory that marks a scope.
#[cfg(not(windows))]
pub const MARKER_DIR: &str = ".xvm";
#[cfg(windows)]
pub const MARKER_DIR: &str = "xvm";

/// Variable holding the user's home directory on this platform.
#[cfg(not(windows))]
pub const HOME_VAR: &str = "HOME";
#[cfg(windows)]
pub const HOME_VAR: &str = "USERPROFILE";

pub const GLOBAL_SCOPE_VAR: &str = "XVMPATH";

const VERSIONS_FILE: &str = "versions";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Local,
    Global,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory holding one set of version assignments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    /// The marker directory itself, e.g. `/home/u/proj/.xvm`.
    pub path: PathBuf,
    /// The directory the marker lives in, e.g. `/home/u/proj`.
    pub parent: PathBuf,
}

impl Scope {
    pub fn global(path: PathBuf) -> Self {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.clone());
        Self {
            kind: ScopeKind::Global,
            path,
            parent,
        }
    }

    fn local(parent: &Path) -> Self {
        Self {
            kind: ScopeKind::Local,
            path: parent.join(MARKER_DIR),
            parent: parent.to_path_buf(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.kind == ScopeKind::Global
    }

    pub fn versions_path(&self) -> PathBuf {
        self.path.join(VERSIONS_FILE)
    }
}

/// Location of the global scope: the `XVMPATH` override when it is set and
/// non-empty, otherwise the marker directory inside the user's home.
pub fn global_root(
    override_path: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf, XvmError> {
    let root = match override_path.filter(|value| !value.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => home
            .filter(|home| !home.as_os_str().is_empty())
            .map(|home| home.join(MARKER_DIR))
            .ok_or(XvmError::MissingHome { home_var: HOME_VAR })?,
    };

    Ok(std::path::absolute(&root).unwrap_or(root))
}

/// Finds the scope nearest to `start_dir`.
///
/// The walk moves towards the filesystem root and stops at the global
/// scope's parent or just below the root; a marker directory found on the
/// way wins. Starting at or above the global scope's parent, without a start
/// directory, or finding nothing nearer yields the global scope.
pub fn resolve_local(global: &Scope, start_dir: Option<&Path>) -> Scope {
    let Some(start_dir) = start_dir else {
        return global.clone();
    };
    if global.parent.starts_with(start_dir) {
        return global.clone();
    }

    for dir in start_dir.ancestors() {
        if dir == global.parent || dir.parent().is_none() {
            break;
        }

        let marker = dir.join(MARKER_DIR);
        if marker.is_dir() {
            debug!(scope = %marker.display(), "found local scope");
            return Scope::local(dir);
        }
    }

    global.clone()
}
