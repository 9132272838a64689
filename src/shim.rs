use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::XvmError;
use crate::plugin::Target;
use crate::process;
use crate::snapshot::Snapshot;

const TOOL_NAME: &str = "xvm";

/// Program name to dispatch on when the binary runs under another name,
/// e.g. through a `node` link to the xvm executable.
pub fn shim_name(argv0: &OsStr) -> Option<String> {
    let name = Path::new(argv0).file_name()?.to_string_lossy().to_string();
    let tool = format!("{TOOL_NAME}{}", std::env::consts::EXE_SUFFIX);
    (name != tool).then_some(name)
}

/// Installed executable for `binary` under the current version of the plugin
/// that ships it.
pub fn resolve_binary(
    global_root: &Path,
    snapshot: &Snapshot,
    binary: &str,
) -> Result<PathBuf, XvmError> {
    let plugin = snapshot
        .binaries
        .get(binary)
        .ok_or_else(|| XvmError::BinaryNotFound(binary.to_string()))?;
    let version = snapshot
        .current
        .get(plugin)
        .ok_or_else(|| XvmError::NoVersionSet(plugin.clone()))?;

    let path = Target::Plugin(plugin.clone())
        .paths(global_root)
        .binary(version, binary);
    if !path.is_file() {
        return Err(XvmError::MissingExecutable {
            binary: binary.to_string(),
            version: version.clone(),
            plugin: plugin.clone(),
        });
    }

    Ok(path)
}

/// Runs the resolved executable with `args` and returns its exit code.
pub fn dispatch(
    global_root: &Path,
    snapshot: &Snapshot,
    binary: &str,
    args: &[OsString],
) -> anyhow::Result<i32> {
    let path = resolve_binary(global_root, snapshot, binary)?;
    info!(binary = binary, path = %path.display(), "dispatching shim");
    process::run(&path, args, std::iter::empty::<(&str, &str)>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(binaries: &[(&str, &str)], current: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            binaries: binaries
                .iter()
                .map(|(b, p)| (b.to_string(), p.to_string()))
                .collect(),
            current: current
                .iter()
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn tool_name_is_not_a_shim() {
        let tool = format!("/usr/local/bin/xvm{}", std::env::consts::EXE_SUFFIX);
        assert_eq!(shim_name(OsStr::new(&tool)), None);
        assert_eq!(
            shim_name(OsStr::new("/home/u/.xvm/shims/node")),
            Some("node".to_string())
        );
    }

    #[test]
    fn unknown_binary_is_not_found() {
        let err = resolve_binary(Path::new("/g"), &snapshot(&[], &[]), "node")
            .expect_err("should fail");
        assert!(matches!(err, XvmError::BinaryNotFound(ref b) if b == "node"));
    }

    #[test]
    fn binary_without_current_version_fails_before_path_lookup() {
        let snap = snapshot(&[("node", "node")], &[]);
        let err = resolve_binary(Path::new("/nonexistent"), &snap, "node")
            .expect_err("should fail");
        assert!(matches!(err, XvmError::NoVersionSet(ref p) if p == "node"));
    }

    #[test]
    fn missing_executable_names_version() {
        let temp = tempfile::tempdir().expect("tempdir");
        let snap = snapshot(&[("npm", "node")], &[("node", "12")]);
        let err = resolve_binary(temp.path(), &snap, "npm").expect_err("should fail");
        assert!(matches!(
            err,
            XvmError::MissingExecutable { ref version, .. } if version == "12"
        ));
    }

    #[test]
    fn resolves_current_version_executable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let expected = Target::Plugin("node".to_string())
            .paths(temp.path())
            .binary("12", "npm");
        std::fs::create_dir_all(expected.parent().expect("bin dir")).expect("create bin dir");
        std::fs::write(&expected, "").expect("write binary");

        let snap = snapshot(&[("npm", "node")], &[("node", "12")]);
        assert_eq!(resolve_binary(temp.path(), &snap, "npm").expect("resolve"), expected);
    }
}
