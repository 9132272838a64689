//! On-disk layout of installable targets under the global scope.
//!
//! A plugin lives in `<global>/installed/<plugin>` and keeps its versions in
//! `installed/<version>`. The xvm installation uses the same layout one level
//! up: its "versions" are the plugins themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use crate::keyval::{self, KeyValMap};

const INSTALLED_DIR: &str = "installed";
const AVAILABLE_FILE: &str = "available";
const ALIASES_FILE: &str = "aliases";
const BIN_DIR: &str = "bin";
const PULL_HELPER: &str = "pull";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    /// The xvm installation; installs and drops plugins.
    Tool,
    /// A managed plugin; installs and drops its versions.
    Plugin(String),
}

impl Target {
    pub fn paths(&self, global_root: &Path) -> TargetPaths {
        let root = match self {
            Self::Tool => global_root.to_path_buf(),
            Self::Plugin(name) => global_root.join(INSTALLED_DIR).join(name),
        };
        TargetPaths { root }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool => f.write_str("plugin"),
            Self::Plugin(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetPaths {
    pub root: PathBuf,
}

impl TargetPaths {
    pub fn installed_dir(&self) -> PathBuf {
        self.root.join(INSTALLED_DIR)
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.installed_dir().join(version)
    }

    pub fn binary(&self, version: &str, binary: &str) -> PathBuf {
        self.version_dir(version).join(BIN_DIR).join(binary)
    }

    pub fn available_file(&self) -> PathBuf {
        self.root.join(AVAILABLE_FILE)
    }

    pub fn aliases_file(&self) -> PathBuf {
        self.root.join(ALIASES_FILE)
    }

    pub fn pull_helper(&self) -> PathBuf {
        self.root
            .join(BIN_DIR)
            .join(format!("{PULL_HELPER}{}", std::env::consts::EXE_SUFFIX))
    }
}

/// Installed, available and aliased versions of one target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetEntry {
    pub installed: BTreeSet<String>,
    /// Version to install-helper content, usually a download URL.
    pub available: KeyValMap,
    pub aliases: KeyValMap,
}

impl TargetEntry {
    pub fn is_installed(&self, version: &str) -> bool {
        self.installed.contains(version)
    }
}

/// Follows `input` through `aliases` until it reaches a name that is not an
/// alias. Unknown input comes back unchanged; a cycle stops at the last new
/// name.
pub fn resolve_alias(aliases: &KeyValMap, input: &str) -> String {
    let mut current = input;
    let mut seen = BTreeSet::new();

    while let Some(next) = aliases.get(current) {
        if !seen.insert(current) {
            break;
        }
        current = next;
    }

    current.to_string()
}

/// Names of the directories directly inside `dir`, sorted. A missing
/// directory has no entries.
pub fn list_dir_names(dir: &Path) -> anyhow::Result<BTreeSet<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to list {}", dir.display()));
        }
    };

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry from {}", dir.display()))?;
        if entry.path().is_dir() {
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// Names of the files directly inside `dir`, sorted.
fn list_file_names(dir: &Path) -> anyhow::Result<BTreeSet<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to list {}", dir.display()));
        }
    };

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry from {}", dir.display()))?;
        if !entry.path().is_dir() {
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// Reads a target's optional key-value file, warning and yielding an empty
/// map when it cannot be used.
pub fn load_table(target: &Target, path: &Path) -> KeyValMap {
    match keyval::read_file(path) {
        Ok(table) => table.unwrap_or_default(),
        Err(err) => {
            warn!(target = %target, error = %err, "ignoring key-value file");
            KeyValMap::new()
        }
    }
}

/// Installed plugins with their installed versions.
pub fn scan_installed(global_root: &Path) -> BTreeMap<String, BTreeSet<String>> {
    let plugins = list_or_warn(&Target::Tool.paths(global_root).installed_dir(), "plugins");

    plugins
        .into_iter()
        .map(|plugin| {
            let installed_dir = Target::Plugin(plugin.clone())
                .paths(global_root)
                .installed_dir();
            let versions = list_or_warn(&installed_dir, &plugin);
            (plugin, versions)
        })
        .collect()
}

/// Executable name to owning plugin, for every installed version. When two
/// plugins ship the same executable the first plugin in name order keeps it.
pub fn scan_binaries(
    global_root: &Path,
    installed: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<String, String> {
    let mut index = BTreeMap::new();

    for (plugin, versions) in installed {
        let paths = Target::Plugin(plugin.clone()).paths(global_root);
        for version in versions {
            let bin_dir = paths.version_dir(version).join(BIN_DIR);
            let binaries = match list_file_names(&bin_dir) {
                Ok(binaries) => binaries,
                Err(err) => {
                    warn!(plugin = %plugin, version = %version, error = %err, "failed to list binaries");
                    continue;
                }
            };
            for binary in binaries {
                index.entry(binary).or_insert_with(|| plugin.clone());
            }
        }
    }

    index
}

fn list_or_warn(dir: &Path, what: &str) -> BTreeSet<String> {
    list_dir_names(dir).unwrap_or_else(|err| {
        warn!(what = what, error = %err, "failed to list installed entries");
        BTreeSet::new()
    })
}
