use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::keyval::KeyValMap;
use crate::plugin::{self, Target, TargetEntry};
use crate::scope::{Scope, ScopeKind};
use crate::versions::{self, VersionMap};

/// Everything one invocation reads from disk, taken once before dispatch.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub local: VersionMap,
    pub global: VersionMap,
    pub current: VersionMap,
    pub targets: BTreeMap<Target, TargetEntry>,
    /// Executable name to owning plugin.
    pub binaries: BTreeMap<String, String>,
}

struct Tables {
    available: KeyValMap,
    aliases: KeyValMap,
}

impl Snapshot {
    /// Scans both scopes and the global installation concurrently and merges
    /// the results once every scan has finished.
    pub fn load(global: &Scope, local: &Scope) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to initialize runtime for filesystem scans")?;

        runtime.block_on(scan(global.clone(), local.clone()))
    }

    pub fn versions(&self, kind: Option<ScopeKind>) -> &VersionMap {
        match kind {
            Some(ScopeKind::Local) => &self.local,
            Some(ScopeKind::Global) => &self.global,
            None => &self.current,
        }
    }

    pub fn entry(&self, target: &Target) -> Option<&TargetEntry> {
        self.targets.get(target)
    }

    /// Concrete version for `input`, or `input` itself when it names no alias
    /// of `target`.
    pub fn resolve_alias(&self, target: &Target, input: &str) -> String {
        match self.entry(target) {
            Some(entry) => plugin::resolve_alias(&entry.aliases, input),
            None => input.to_string(),
        }
    }
}

async fn scan(global: Scope, local: Scope) -> anyhow::Result<Snapshot> {
    let global_root = global.path.clone();
    let separate_local = local != global;

    let global_versions = tokio::task::spawn_blocking({
        let global = global.clone();
        move || versions::load(&global)
    });
    let local_versions = tokio::task::spawn_blocking(move || {
        separate_local.then(|| versions::load(&local))
    });
    let installed = tokio::task::spawn_blocking({
        let root = global_root.clone();
        move || {
            let installed = plugin::scan_installed(&root);
            let binaries = plugin::scan_binaries(&root, &installed);
            (installed, binaries)
        }
    });
    let tables = tokio::task::spawn_blocking({
        let root = global_root.clone();
        move || scan_tables(&root)
    });

    // Join every scan before anything reads the results.
    let global_versions = global_versions
        .await
        .context("global versions scan panicked")?;
    let local_versions = local_versions
        .await
        .context("local versions scan panicked")?
        .unwrap_or_else(|| global_versions.clone());
    let (installed, binaries) = installed.await.context("installed scan panicked")?;
    let tables = tables.await.context("available scan panicked")?;

    let current = versions::merge(&local_versions, &global_versions);
    let targets = assemble_targets(installed, tables);

    debug!(
        local_versions = local_versions.len(),
        global_versions = global_versions.len(),
        targets = targets.len(),
        binaries = binaries.len(),
        "snapshot loaded"
    );

    Ok(Snapshot {
        local: local_versions,
        global: global_versions,
        current,
        targets,
        binaries,
    })
}

fn scan_tables(global_root: &Path) -> BTreeMap<Target, Tables> {
    let tool_installed_dir = Target::Tool.paths(global_root).installed_dir();
    let plugins = plugin::list_dir_names(&tool_installed_dir).unwrap_or_default();

    std::iter::once(Target::Tool)
        .chain(plugins.into_iter().map(Target::Plugin))
        .map(|target| {
            let paths = target.paths(global_root);
            let tables = Tables {
                available: plugin::load_table(&target, &paths.available_file()),
                aliases: plugin::load_table(&target, &paths.aliases_file()),
            };
            (target, tables)
        })
        .collect()
}

fn assemble_targets(
    installed: BTreeMap<String, BTreeSet<String>>,
    mut tables: BTreeMap<Target, Tables>,
) -> BTreeMap<Target, TargetEntry> {
    let mut targets = BTreeMap::new();

    let plugin_names: BTreeSet<String> = installed.keys().cloned().collect();
    let (available, aliases) = match tables.remove(&Target::Tool) {
        Some(t) => (t.available, t.aliases),
        None => Default::default(),
    };
    targets.insert(
        Target::Tool,
        TargetEntry {
            installed: plugin_names,
            available,
            aliases,
        },
    );

    for (name, versions) in installed {
        let target = Target::Plugin(name);
        let (available, aliases) = match tables.remove(&target) {
            Some(t) => (t.available, t.aliases),
            None => Default::default(),
        };
        targets.insert(
            target,
            TargetEntry {
                installed: versions,
                available,
                aliases,
            },
        );
    }

    targets
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn write(path: PathBuf, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write fixture");
    }

    fn fixture() -> (tempfile::TempDir, Scope, Scope) {
        let temp = tempfile::tempdir().expect("tempdir");
        let global = Scope::global(temp.path().join("home").join(".xvm"));
        let proj = temp.path().join("home").join("proj");
        std::fs::create_dir_all(proj.join(".xvm")).expect("local scope");
        let local = Scope {
            kind: ScopeKind::Local,
            path: proj.join(".xvm"),
            parent: proj,
        };
        (temp, global, local)
    }

    #[test]
    fn merges_local_over_global() {
        let (_temp, global, local) = fixture();
        write(global.versions_path(), "node 10\ngo 1.21\n");
        write(local.versions_path(), "node 12\n");

        let snapshot = Snapshot::load(&global, &local).expect("snapshot");
        assert_eq!(snapshot.current["node"], "12");
        assert_eq!(snapshot.current["go"], "1.21");
        assert_eq!(snapshot.versions(Some(ScopeKind::Global))["node"], "10");
        assert_eq!(snapshot.versions(Some(ScopeKind::Local)).len(), 1);
    }

    #[test]
    fn malformed_local_versions_leave_global_usable() {
        let (_temp, global, local) = fixture();
        write(global.versions_path(), "node 10\n");
        write(local.versions_path(), " broken\n");

        let snapshot = Snapshot::load(&global, &local).expect("snapshot");
        assert!(snapshot.local.is_empty());
        assert_eq!(snapshot.current["node"], "10");
    }

    #[test]
    fn local_equal_to_global_mirrors_global() {
        let (_temp, global, _local) = fixture();
        write(global.versions_path(), "node 10\n");

        let snapshot = Snapshot::load(&global, &global).expect("snapshot");
        assert_eq!(snapshot.local, snapshot.global);
        assert_eq!(snapshot.current, snapshot.global);
    }

    #[test]
    fn collects_tables_and_installed_versions() {
        let (_temp, global, local) = fixture();
        let node = Target::Plugin("node".to_string());
        let paths = node.paths(&global.path);
        write(paths.available_file(), "12.4.0 https://example.com/node-12.tgz\n");
        write(paths.aliases_file(), "stable 12.4.0\n");
        write(paths.binary("12.4.0", "node"), "");
        write(global.path.join("available"), "node https://example.com/node.tar.gz\n");

        let snapshot = Snapshot::load(&global, &local).expect("snapshot");
        let entry = snapshot.entry(&node).expect("node entry");
        assert!(entry.is_installed("12.4.0"));
        assert!(entry.available.contains_key("12.4.0"));
        assert_eq!(snapshot.resolve_alias(&node, "stable"), "12.4.0");
        assert_eq!(snapshot.resolve_alias(&node, "11"), "11");
        assert_eq!(snapshot.binaries["node"], "node");

        let tool = snapshot.entry(&Target::Tool).expect("tool entry");
        assert!(tool.is_installed("node"));
        assert!(tool.available.contains_key("node"));
    }

    #[test]
    fn unknown_target_passes_alias_through() {
        let snapshot = Snapshot::default();
        let target = Target::Plugin("ghost".to_string());
        assert_eq!(snapshot.resolve_alias(&target, "stable"), "stable");
    }
}
