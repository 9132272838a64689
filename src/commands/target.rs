use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use tracing::{info, warn};

use crate::context::Context;
use crate::error::XvmError;
use crate::plugin::{Target, TargetEntry};
use crate::process;

const PULL_DESTDIR_VAR: &str = "XVM_PULL_DESTDIR";
const PULL_VERSION_VAR: &str = "XVM_PULL_VERSION";
const PULL_CONTENT_VAR: &str = "XVM_PULL_CONTENT";

pub(super) fn run_installed(context: &Context, target: &Target) -> anyhow::Result<i32> {
    for version in &entry(context, target)?.installed {
        println!("{version}");
    }
    Ok(0)
}

pub(super) fn run_available(context: &Context, target: &Target) -> anyhow::Result<i32> {
    for version in entry(context, target)?.available.keys() {
        println!("{version}");
    }
    Ok(0)
}

pub(super) fn run_alias(context: &Context, target: &Target, alias: &str) -> anyhow::Result<i32> {
    let entry = entry(context, target)?;
    if !entry.aliases.contains_key(alias) {
        return Err(XvmError::AliasMissing {
            target: target.to_string(),
            alias: alias.to_string(),
        }
        .into());
    }

    println!("{}", context.snapshot.resolve_alias(target, alias));
    Ok(0)
}

pub(super) fn run_pull(context: &Context, target: &Target, requested: &str) -> anyhow::Result<i32> {
    let version = context.snapshot.resolve_alias(target, requested);
    let content = entry(context, target)?
        .available
        .get(&version)
        .ok_or_else(|| XvmError::NotAvailable {
            target: target.to_string(),
            version: version.clone(),
        })?;

    let paths = target.paths(context.global_root());
    let helper = paths.pull_helper();
    if !helper.is_file() {
        anyhow::bail!("{target} has no pull helper at {}", helper.display());
    }

    let dest = paths.version_dir(&version);
    fs::create_dir_all(&dest)
        .with_context(|| format!("failed to create install directory {}", dest.display()))?;

    info!(target = %target, version = %version, dest = %dest.display(), "running pull helper");
    process::run_checked(
        &helper,
        &[],
        [
            (PULL_DESTDIR_VAR, dest.as_os_str()),
            (PULL_VERSION_VAR, OsStr::new(&version)),
            (PULL_CONTENT_VAR, OsStr::new(content)),
        ],
    )?;

    Ok(0)
}

pub(super) fn run_drop(context: &Context, target: &Target, requested: &str) -> anyhow::Result<i32> {
    let version = installed_version(context, target, requested)?;
    let dir = target.paths(context.global_root()).version_dir(&version);

    fs::remove_dir_all(&dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    info!(target = %target, version = %version, "dropped installed version");

    match target {
        Target::Plugin(name) if context.snapshot.current.get(name) == Some(&version) => {
            warn!(plugin = %name, version = %version, "dropped version is still set as current");
        }
        Target::Tool if context.snapshot.current.contains_key(&version) => {
            warn!(plugin = %version, "dropped plugin still has a version set");
        }
        _ => {}
    }

    Ok(0)
}

pub(super) fn run_edit(context: &Context, target: &Target, requested: &str) -> anyhow::Result<i32> {
    let version = installed_version(context, target, requested)?;
    let dir = target.paths(context.global_root()).version_dir(&version);

    let editor = context
        .config
        .editor
        .as_deref()
        .ok_or_else(|| XvmError::EditorUnset(context.config.config_path.clone()))?;
    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| XvmError::EditorUnset(context.config.config_path.clone()))?;
    let mut args: Vec<OsString> = words.map(OsString::from).collect();
    args.push(dir.into_os_string());

    process::run_checked(Path::new(program), &args, std::iter::empty::<(&str, &str)>())?;
    Ok(0)
}

fn entry<'a>(context: &'a Context, target: &Target) -> Result<&'a TargetEntry, XvmError> {
    context
        .snapshot
        .entry(target)
        .ok_or_else(|| XvmError::NotInstalled {
            target: Target::Tool.to_string(),
            version: target.to_string(),
        })
}

/// Concrete installed version for `requested`, resolving aliases.
fn installed_version(
    context: &Context,
    target: &Target,
    requested: &str,
) -> Result<String, XvmError> {
    let version = context.snapshot.resolve_alias(target, requested);
    if entry(context, target)?.is_installed(&version) {
        Ok(version)
    } else {
        Err(XvmError::NotInstalled {
            target: target.to_string(),
            version,
        })
    }
}
