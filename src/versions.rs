use tracing::{debug, warn};

use crate::keyval::{self, KeyValMap};
use crate::scope::Scope;

/// Plugin name to version identifier.
pub type VersionMap = KeyValMap;

/// Loads the version assignments of `scope` for reading.
///
/// Unreadable or ill-formatted files contribute an empty map so the other
/// scope still resolves.
pub fn load(scope: &Scope) -> VersionMap {
    let path = scope.versions_path();
    match keyval::read_file(&path) {
        Ok(Some(versions)) => versions,
        Ok(None) => {
            debug!(scope = %scope.kind, path = %path.display(), "no versions file");
            VersionMap::new()
        }
        Err(err) => {
            warn!(scope = %scope.kind, error = %err, "ignoring versions file");
            VersionMap::new()
        }
    }
}

/// Loads the version assignments of `scope` before rewriting them. Unlike
/// [`load`], an ill-formatted file is an error so it is never clobbered.
pub fn load_for_update(scope: &Scope) -> anyhow::Result<VersionMap> {
    Ok(keyval::read_file(&scope.versions_path())?.unwrap_or_default())
}

pub fn write(scope: &Scope, versions: &VersionMap) -> anyhow::Result<()> {
    keyval::write_file(&scope.versions_path(), versions)
}

/// Current versions: every key of either map, the local value winning.
pub fn merge(local: &VersionMap, global: &VersionMap) -> VersionMap {
    let mut merged = global.clone();
    merged.extend(
        local
            .iter()
            .map(|(plugin, version)| (plugin.clone(), version.clone())),
    );
    merged
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::scope::ScopeKind;
    use proptest::prelude::*;

    fn map(entries: &[(&str, &str)]) -> VersionMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn local_wins_on_overlap() {
        let merged = merge(&map(&[("node", "12")]), &map(&[("node", "10"), ("go", "1.21")]));
        assert_eq!(merged, map(&[("node", "12"), ("go", "1.21")]));
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scope = Scope::global(temp.path().join(".xvm"));
        assert!(load(&scope).is_empty());
        assert!(load_for_update(&scope).expect("load").is_empty());
    }

    #[test]
    fn ill_formatted_file_loads_empty_but_blocks_update() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scope = Scope {
            kind: ScopeKind::Local,
            path: temp.path().join(".xvm"),
            parent: PathBuf::from(temp.path()),
        };
        std::fs::create_dir_all(&scope.path).expect("scope dir");
        std::fs::write(scope.versions_path(), "node 12\n go 1\n").expect("write");

        assert!(load(&scope).is_empty());
        assert!(load_for_update(&scope).is_err());
    }

    #[test]
    fn write_then_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scope = Scope::global(temp.path().join(".xvm"));
        let versions = map(&[("node", "12.4.0"), ("java", "openjdk 21")]);

        write(&scope, &versions).expect("write");
        assert_eq!(load(&scope), versions);
    }

    proptest! {
        #[test]
        fn merge_respects_local_precedence(
            local in proptest::collection::btree_map("[a-d]{1,2}", "[0-9]{1,3}", 0..8),
            global in proptest::collection::btree_map("[a-d]{1,2}", "[0-9]{1,3}", 0..8),
        ) {
            let merged = merge(&local, &global);

            for (plugin, version) in &merged {
                let expected = local.get(plugin).or_else(|| global.get(plugin));
                prop_assert_eq!(Some(version), expected);
            }
            for plugin in local.keys().chain(global.keys()) {
                prop_assert!(merged.contains_key(plugin));
            }
        }
    }
}
